use std::f64::consts::PI;

use landview_shared::{FocusRequest, GeoBounds, LatLng};
use thiserror::Error;

use crate::config::{
    FIT_PADDING_PX, FOCUS_ANIMATION_MS, MAX_ZOOM, MIN_ZOOM, VIEWPORT_SETTLE_MS,
};

pub const TILE_SIZE: f64 = 256.0;
const MAX_LATITUDE: f64 = 85.051_128_779_806_6;
/// Bounds that moved less than this many screen pixels are not re-emitted.
const JITTER_PX: f64 = 0.5;

/// Side length of the Web Mercator world in pixels at `zoom`.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// Spherical Web Mercator: lat/lng to world pixels at `zoom`.
pub fn project(ll: LatLng, zoom: f64) -> (f64, f64) {
    let ws = world_size(zoom);
    let x = (ll.lng + 180.0) / 360.0 * ws;
    let sin = ll.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians().sin();
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * ws;
    (x, y)
}

pub fn unproject(x: f64, y: f64, zoom: f64) -> LatLng {
    let ws = world_size(zoom);
    let lng = x / ws * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / ws;
    LatLng::new(n.sinh().atan().to_degrees(), lng)
}

pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

fn clamp_center(ll: LatLng) -> LatLng {
    LatLng::new(
        ll.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
        ll.lng.clamp(-180.0, 180.0),
    )
}

/// Cubic ease-out: decelerating to zero velocity.
fn cubic_ease_out(t: f64) -> f64 {
    let t = t - 1.0;
    t * t * t + 1.0
}

/// The visible map: center, fractional zoom and pixel size of the container.
///
/// "World" coordinates below are Web Mercator pixels at zoom 0 (a 256×256
/// square), so geometry projected once stays valid at every zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl MapView {
    pub fn new(focus: FocusRequest, width: f64, height: f64) -> Self {
        Self {
            center: clamp_center(focus.center),
            zoom: clamp_zoom(focus.zoom),
            width,
            height,
        }
    }

    /// Pixels per world unit.
    pub fn scale(&self) -> f64 {
        self.zoom.exp2()
    }

    /// World pixel (at the current zoom) under the top-left screen corner.
    fn pixel_origin(&self) -> (f64, f64) {
        let (cx, cy) = project(self.center, self.zoom);
        (cx - self.width / 2.0, cy - self.height / 2.0)
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        let s = self.scale();
        let (ox, oy) = self.pixel_origin();
        (wx * s - ox, wy * s - oy)
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        let s = self.scale();
        let (ox, oy) = self.pixel_origin();
        ((sx + ox) / s, (sy + oy) / s)
    }

    pub fn latlng_to_screen(&self, ll: LatLng) -> (f64, f64) {
        let (px, py) = project(ll, self.zoom);
        let (ox, oy) = self.pixel_origin();
        (px - ox, py - oy)
    }

    pub fn screen_to_latlng(&self, sx: f64, sy: f64) -> LatLng {
        let (ox, oy) = self.pixel_origin();
        unproject(sx + ox, sy + oy, self.zoom)
    }

    /// Geographic extent of the container.
    pub fn bounds(&self) -> GeoBounds {
        let nw = self.screen_to_latlng(0.0, 0.0);
        let se = self.screen_to_latlng(self.width, self.height);
        GeoBounds::new(nw.lng, se.lat, se.lng, nw.lat)
    }

    /// Pan by a screen-space delta (content follows the pointer).
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let (cx, cy) = project(self.center, self.zoom);
        self.center = clamp_center(unproject(cx - dx, cy - dy, self.zoom));
    }

    /// Change zoom keeping the geographic point under `(sx, sy)` fixed.
    pub fn zoom_around(&mut self, zoom: f64, sx: f64, sy: f64) {
        let zoom = clamp_zoom(zoom);
        let anchor = self.screen_to_latlng(sx, sy);
        let (ax, ay) = project(anchor, zoom);
        let cx = ax - (sx - self.width / 2.0);
        let cy = ay - (sy - self.height / 2.0);
        self.zoom = zoom;
        self.center = clamp_center(unproject(cx, cy, zoom));
    }

    /// Largest whole zoom at which `bounds` fits inside the container with
    /// `padding` pixels on every side.
    pub fn fit_zoom(&self, bounds: &GeoBounds, padding: f64) -> f64 {
        let (x0, y0) = project(LatLng::new(bounds.north, bounds.west), 0.0);
        let (x1, y1) = project(LatLng::new(bounds.south, bounds.east), 0.0);
        let span_x = (x1 - x0).abs();
        let span_y = (y1 - y0).abs();
        let avail_w = (self.width - 2.0 * padding).max(1.0);
        let avail_h = (self.height - 2.0 * padding).max(1.0);

        let scale_x = if span_x > 0.0 { avail_w / span_x } else { f64::INFINITY };
        let scale_y = if span_y > 0.0 { avail_h / span_y } else { f64::INFINITY };
        let scale = scale_x.min(scale_y);
        if !scale.is_finite() {
            return MAX_ZOOM;
        }
        clamp_zoom(scale.log2().floor())
    }

    /// Center and zoom that frame `bounds`.
    pub fn fit_target(&self, bounds: &GeoBounds, padding: f64) -> FocusRequest {
        let zoom = self.fit_zoom(bounds, padding);
        let (x0, y0) = project(LatLng::new(bounds.north, bounds.west), zoom);
        let (x1, y1) = project(LatLng::new(bounds.south, bounds.east), zoom);
        let center = unproject((x0 + x1) / 2.0, (y0 + y1) / 2.0, zoom);
        FocusRequest { center, zoom }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Ready,
    Disposed,
}

/// Who moved the map. Only `User` moves should cause a re-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportOrigin {
    User,
    Programmatic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportChange {
    pub bounds: GeoBounds,
    pub origin: ViewportOrigin,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("map is already mounted")]
    AlreadyMounted,
    #[error("map has been disposed")]
    Disposed,
    #[error("map container has no size ({width}x{height})")]
    ZeroSize { width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy)]
struct Animation {
    from: FocusRequest,
    to: FocusRequest,
    start: f64,
    duration: f64,
    /// Origin reported once the animation settles.
    settle_origin: ViewportOrigin,
}

impl Animation {
    /// Pose at `now`, and whether the animation has finished.
    fn sample(&self, now: f64) -> (FocusRequest, bool) {
        let elapsed = now - self.start;
        if elapsed >= self.duration {
            return (self.to, true);
        }
        let t = cubic_ease_out((elapsed / self.duration).max(0.0));
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        let pose = FocusRequest {
            center: LatLng::new(
                lerp(self.from.center.lat, self.to.center.lat),
                lerp(self.from.center.lng, self.to.center.lng),
            ),
            zoom: lerp(self.from.zoom, self.to.zoom),
        };
        (pose, false)
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingEmit {
    due: f64,
    origin: ViewportOrigin,
}

/// Owns the map view and turns gestures and focus requests into settled
/// viewport-change events. Time is passed in by the caller (milliseconds).
pub struct MapController {
    state: ControllerState,
    view: MapView,
    animation: Option<Animation>,
    pending: Option<PendingEmit>,
    last_emitted: Option<GeoBounds>,
}

impl MapController {
    pub fn new(initial: FocusRequest) -> Self {
        Self {
            state: ControllerState::Uninitialized,
            view: MapView::new(initial, 0.0, 0.0),
            animation: None,
            pending: None,
            last_emitted: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ControllerState::Ready
    }

    /// The live view, only while mounted.
    pub fn view(&self) -> Option<&MapView> {
        self.is_ready().then_some(&self.view)
    }

    /// Attach to a container of the given size. The first viewport change is
    /// scheduled here so the initial bounds are always reported.
    pub fn mount(&mut self, width: f64, height: f64, now: f64) -> Result<(), MapError> {
        match self.state {
            ControllerState::Ready => return Err(MapError::AlreadyMounted),
            ControllerState::Disposed => return Err(MapError::Disposed),
            ControllerState::Uninitialized => {}
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(MapError::ZeroSize { width, height });
        }
        self.view.width = width;
        self.view.height = height;
        self.state = ControllerState::Ready;
        self.schedule(ViewportOrigin::User, now);
        Ok(())
    }

    pub fn resize(&mut self, width: f64, height: f64, now: f64) {
        if !self.is_ready() || width <= 0.0 || height <= 0.0 {
            return;
        }
        if self.view.width == width && self.view.height == height {
            return;
        }
        self.view.width = width;
        self.view.height = height;
        self.schedule(ViewportOrigin::User, now);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64, now: f64) {
        if !self.is_ready() {
            return;
        }
        self.animation = None;
        self.view.pan_by(dx, dy);
        self.schedule(ViewportOrigin::User, now);
    }

    /// Zoom by `delta` levels around a screen point.
    pub fn zoom_at(&mut self, delta: f64, sx: f64, sy: f64, now: f64) {
        if !self.is_ready() {
            return;
        }
        self.animation = None;
        let target = self.view.zoom + delta;
        self.view.zoom_around(target, sx, sy);
        self.schedule(ViewportOrigin::User, now);
    }

    /// Animate to a center and zoom. A pending change is folded into the
    /// emission at the end of the animation; a `User` one (the mount emission
    /// included) keeps its origin so the query it stands for still fires.
    pub fn focus(&mut self, request: FocusRequest, now: f64) {
        if !self.is_ready() {
            return;
        }
        let to = FocusRequest {
            center: clamp_center(request.center),
            zoom: clamp_zoom(request.zoom),
        };
        let owes_user = self
            .pending
            .take()
            .is_some_and(|p| p.origin == ViewportOrigin::User)
            || self
                .animation
                .is_some_and(|a| a.settle_origin == ViewportOrigin::User);
        let settle_origin = if owes_user {
            ViewportOrigin::User
        } else {
            ViewportOrigin::Programmatic
        };
        self.animation = Some(Animation {
            from: FocusRequest {
                center: self.view.center,
                zoom: self.view.zoom,
            },
            to,
            start: now,
            duration: FOCUS_ANIMATION_MS,
            settle_origin,
        });
    }

    /// Animate to frame `bounds` with the standard padding. Returns false for
    /// invalid bounds or when not mounted.
    pub fn fit_bounds(&mut self, bounds: GeoBounds, now: f64) -> bool {
        if !self.is_ready() || !bounds.is_valid() {
            return false;
        }
        let target = self.view.fit_target(&bounds, FIT_PADDING_PX);
        self.focus(target, now);
        true
    }

    /// True while an animation runs or a change is waiting to settle.
    pub fn needs_tick(&self) -> bool {
        self.is_ready() && (self.animation.is_some() || self.pending.is_some())
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Advance animations and emit a settled viewport change if one is due.
    pub fn tick(&mut self, now: f64) -> Option<ViewportChange> {
        if !self.is_ready() {
            return None;
        }

        if let Some(animation) = self.animation {
            let (pose, finished) = animation.sample(now);
            self.view.center = pose.center;
            self.view.zoom = pose.zoom;
            if finished {
                self.animation = None;
                self.schedule(animation.settle_origin, now);
            }
        }

        let pending = self.pending?;
        if now < pending.due {
            return None;
        }
        self.pending = None;

        let bounds = self.view.bounds();
        if let Some(previous) = self.last_emitted
            && self.is_jitter(&previous)
        {
            return None;
        }
        self.last_emitted = Some(bounds);
        Some(ViewportChange {
            bounds,
            origin: pending.origin,
        })
    }

    /// Release the view. Every later call is a no-op.
    pub fn dispose(&mut self) {
        self.state = ControllerState::Disposed;
        self.animation = None;
        self.pending = None;
    }

    fn schedule(&mut self, origin: ViewportOrigin, now: f64) {
        self.pending = Some(PendingEmit {
            due: now + VIEWPORT_SETTLE_MS,
            origin,
        });
    }

    /// Whether `previous` lands within half a pixel of the current corners.
    fn is_jitter(&self, previous: &GeoBounds) -> bool {
        let (ax, ay) = self
            .view
            .latlng_to_screen(LatLng::new(previous.north, previous.west));
        let (bx, by) = self
            .view
            .latlng_to_screen(LatLng::new(previous.south, previous.east));
        ax.abs() < JITTER_PX
            && ay.abs() < JITTER_PX
            && (bx - self.view.width).abs() < JITTER_PX
            && (by - self.view.height).abs() < JITTER_PX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landview_shared::region::INITIAL_VIEW;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    fn mounted() -> MapController {
        let mut controller = MapController::new(INITIAL_VIEW);
        controller.mount(800.0, 600.0, 0.0).expect("mount");
        controller
    }

    /// Mounted controller whose initial emission has been consumed.
    fn settled() -> MapController {
        let mut controller = mounted();
        assert!(controller.tick(VIEWPORT_SETTLE_MS).is_some());
        controller
    }

    #[test]
    fn projection_roundtrip() {
        let dar = LatLng::new(-6.7924, 39.2083);
        for zoom in [0.0, 6.0, 13.5] {
            let (x, y) = project(dar, zoom);
            let back = unproject(x, y, zoom);
            assert_close(back.lat, dar.lat, 1e-9);
            assert_close(back.lng, dar.lng, 1e-9);
        }
        let (x, y) = project(LatLng::new(0.0, 0.0), 0.0);
        assert_close(x, 128.0, 1e-9);
        assert_close(y, 128.0, 1e-9);
    }

    #[test]
    fn view_bounds_surround_center() {
        let view = MapView::new(INITIAL_VIEW, 800.0, 600.0);
        let b = view.bounds();
        assert!(b.west < view.center.lng && view.center.lng < b.east);
        assert!(b.south < view.center.lat && view.center.lat < b.north);
        let (sx, sy) = view.latlng_to_screen(view.center);
        assert_close(sx, 400.0, 1e-6);
        assert_close(sy, 300.0, 1e-6);
    }

    #[test]
    fn screen_world_conversions_agree() {
        let view = MapView::new(FocusRequest::new(-6.79, 39.21, 13.0), 800.0, 600.0);
        let (wx, wy) = view.screen_to_world(123.0, 456.0);
        let (sx, sy) = view.world_to_screen(wx, wy);
        assert_close(sx, 123.0, 1e-6);
        assert_close(sy, 456.0, 1e-6);
    }

    #[test]
    fn zoom_around_keeps_anchor_fixed() {
        let mut view = MapView::new(FocusRequest::new(-6.79, 39.21, 12.0), 800.0, 600.0);
        let anchor = view.screen_to_latlng(200.0, 150.0);
        view.zoom_around(14.0, 200.0, 150.0);
        let (sx, sy) = view.latlng_to_screen(anchor);
        assert_close(sx, 200.0, 1e-6);
        assert_close(sy, 150.0, 1e-6);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = MapView::new(FocusRequest::new(0.0, 0.0, 25.0), 800.0, 600.0);
        assert_eq!(view.zoom, MAX_ZOOM);
        view.zoom_around(-4.0, 400.0, 300.0);
        assert_eq!(view.zoom, MIN_ZOOM);
    }

    #[test]
    fn fit_zoom_is_the_largest_that_fits_with_padding() {
        let view = MapView::new(INITIAL_VIEW, 800.0, 600.0);
        let bounds = GeoBounds::new(39.20, -6.80, 39.25, -6.76);
        let target = view.fit_target(&bounds, FIT_PADDING_PX);
        let fitted = MapView::new(target, 800.0, 600.0);

        let (x0, y0) = fitted.latlng_to_screen(LatLng::new(bounds.north, bounds.west));
        let (x1, y1) = fitted.latlng_to_screen(LatLng::new(bounds.south, bounds.east));
        assert!(x0 >= FIT_PADDING_PX - 1e-6 && y0 >= FIT_PADDING_PX - 1e-6);
        assert!(x1 <= 800.0 - FIT_PADDING_PX + 1e-6 && y1 <= 600.0 - FIT_PADDING_PX + 1e-6);

        let closer = MapView::new(
            FocusRequest {
                center: target.center,
                zoom: target.zoom + 1.0,
            },
            800.0,
            600.0,
        );
        let (cx0, _) = closer.latlng_to_screen(LatLng::new(bounds.north, bounds.west));
        let (_, cy1) = closer.latlng_to_screen(LatLng::new(bounds.south, bounds.east));
        assert!(cx0 < FIT_PADDING_PX || cy1 > 600.0 - FIT_PADDING_PX);
    }

    #[test]
    fn point_bounds_fit_at_max_zoom() {
        let view = MapView::new(INITIAL_VIEW, 800.0, 600.0);
        let point = GeoBounds::new(39.2, -6.8, 39.2, -6.8);
        assert_eq!(view.fit_zoom(&point, FIT_PADDING_PX), MAX_ZOOM);
    }

    #[test]
    fn mount_only_from_uninitialized() {
        let mut controller = MapController::new(INITIAL_VIEW);
        assert!(controller.view().is_none());
        assert_eq!(
            controller.mount(0.0, 600.0, 0.0),
            Err(MapError::ZeroSize {
                width: 0.0,
                height: 600.0
            })
        );
        assert_eq!(controller.state(), ControllerState::Uninitialized);
        controller.mount(800.0, 600.0, 0.0).expect("mount");
        assert_eq!(controller.state(), ControllerState::Ready);
        assert_eq!(
            controller.mount(800.0, 600.0, 0.0),
            Err(MapError::AlreadyMounted)
        );
        controller.dispose();
        assert_eq!(controller.mount(800.0, 600.0, 0.0), Err(MapError::Disposed));
    }

    #[test]
    fn mount_emits_once_after_settle() {
        let mut controller = mounted();
        assert_eq!(controller.tick(VIEWPORT_SETTLE_MS - 1.0), None);
        let change = controller.tick(VIEWPORT_SETTLE_MS).expect("initial change");
        assert_eq!(change.origin, ViewportOrigin::User);
        assert_eq!(controller.tick(VIEWPORT_SETTLE_MS + 100.0), None);
        assert!(!controller.needs_tick());
    }

    #[test]
    fn gestures_restart_the_settle_timer() {
        let mut controller = settled();
        controller.pan_by(40.0, 0.0, 1_000.0);
        controller.pan_by(40.0, 0.0, 1_100.0);
        assert_eq!(controller.tick(1_200.0), None);
        let change = controller.tick(1_250.0).expect("settled change");
        assert_eq!(change.origin, ViewportOrigin::User);
        assert!(change.bounds.west < INITIAL_VIEW.center.lng);
    }

    #[test]
    fn sub_pixel_moves_are_suppressed() {
        let mut controller = settled();
        controller.pan_by(0.2, -0.1, 1_000.0);
        assert!(controller.needs_tick());
        assert_eq!(controller.tick(1_000.0 + VIEWPORT_SETTLE_MS), None);
        assert!(!controller.needs_tick());

        controller.pan_by(3.0, 0.0, 2_000.0);
        assert!(controller.tick(2_000.0 + VIEWPORT_SETTLE_MS).is_some());
    }

    #[test]
    fn focus_animates_then_emits_programmatic_change() {
        let mut controller = settled();
        let target = FocusRequest::new(-6.7924, 39.2083, 13.0);
        controller.focus(target, 1_000.0);
        assert!(controller.is_animating());

        assert_eq!(controller.tick(1_150.0), None);
        let mid = *controller.view().expect("ready");
        assert!(mid.zoom > INITIAL_VIEW.zoom && mid.zoom < 13.0);

        assert_eq!(controller.tick(1_000.0 + FOCUS_ANIMATION_MS), None);
        assert!(!controller.is_animating());
        let view = controller.view().expect("ready");
        assert_eq!(view.zoom, 13.0);
        assert_close(view.center.lat, -6.7924, 1e-9);

        let change = controller
            .tick(1_000.0 + FOCUS_ANIMATION_MS + VIEWPORT_SETTLE_MS)
            .expect("programmatic change");
        assert_eq!(change.origin, ViewportOrigin::Programmatic);
    }

    #[test]
    fn fit_before_first_settle_still_reports_user_change() {
        let mut controller = mounted();
        let dar = GeoBounds::new(39.2, -6.85, 39.3, -6.75);
        assert!(controller.fit_bounds(dar, 50.0));

        let mut origins = Vec::new();
        let mut now = 50.0;
        while now <= 2_000.0 {
            if let Some(change) = controller.tick(now) {
                origins.push(change.origin);
            }
            now += 16.0;
        }
        assert_eq!(origins, vec![ViewportOrigin::User]);
        let view = controller.view().expect("ready");
        assert!(view.zoom > INITIAL_VIEW.zoom);
    }

    #[test]
    fn chained_focus_keeps_owed_user_change() {
        let mut controller = mounted();
        controller.focus(FocusRequest::new(-6.7924, 39.2083, 13.0), 20.0);
        controller.focus(FocusRequest::new(-3.3869, 36.6830, 12.0), 100.0);
        controller.tick(100.0 + FOCUS_ANIMATION_MS);
        let change = controller
            .tick(100.0 + FOCUS_ANIMATION_MS + VIEWPORT_SETTLE_MS)
            .expect("settled change");
        assert_eq!(change.origin, ViewportOrigin::User);
    }

    #[test]
    fn user_gesture_cancels_animation() {
        let mut controller = settled();
        controller.focus(FocusRequest::new(-3.3869, 36.6830, 12.0), 1_000.0);
        controller.tick(1_100.0);
        controller.zoom_at(1.0, 400.0, 300.0, 1_120.0);
        assert!(!controller.is_animating());
        let change = controller
            .tick(1_120.0 + VIEWPORT_SETTLE_MS)
            .expect("user change");
        assert_eq!(change.origin, ViewportOrigin::User);
    }

    #[test]
    fn fit_bounds_rejects_invalid_bounds() {
        let mut controller = settled();
        assert!(!controller.fit_bounds(GeoBounds::new(40.0, 0.0, 39.0, 1.0), 1_000.0));
        assert!(controller.fit_bounds(GeoBounds::new(39.2, -6.8, 39.25, -6.76), 1_000.0));
        assert!(controller.is_animating());
    }

    #[test]
    fn disposed_controller_ignores_everything() {
        let mut controller = mounted();
        controller.dispose();
        controller.pan_by(100.0, 100.0, 10.0);
        controller.focus(INITIAL_VIEW, 10.0);
        assert_eq!(controller.tick(1_000.0), None);
        assert!(controller.view().is_none());
        assert!(!controller.needs_tick());
    }
}
