use std::cell::{Cell, RefCell};
use std::f64::consts::TAU;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, CanvasWindingRule, HtmlCanvasElement, MouseEvent, PointerEvent,
    WheelEvent,
};

use landview_shared::region::INITIAL_VIEW;

use crate::app::{HoverTooltip, MapRequest, MapRequests, Measure, ParcelStore, SidebarOpen};
use crate::colors::{rgba_css, style_css};
use crate::config::{TILE_ATTRIBUTION, WHEEL_PX_PER_ZOOM_LEVEL};
use crate::layer::ParcelLayer;
use crate::measure::{MeasureMode, MeasureTool};
use crate::render_loop::RenderScheduler;
use crate::spatial::ProjectedShape;
use crate::tiles::{LoadedTile, TileLoader, tile_zoom};
use crate::viewport::{ControllerState, MapController, MapView};

/// Pointer travel below which a press counts as a click rather than a drag.
const CLICK_SLOP_PX: f64 = 5.0;
/// `WheelEvent.deltaMode == DOM_DELTA_LINE`.
const WHEEL_LINE_PX: f64 = 16.0;
const MAP_BACKGROUND: &str = "#e8e4da";
const MEASURE_COLOR: (u8, u8, u8) = (225, 29, 72);

struct ResizeBinding {
    window: web_sys::Window,
    _handler: Closure<dyn Fn()>,
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
    static ACTIVE_MAP: RefCell<Option<Rc<RefCell<MapController>>>> = const { RefCell::new(None) };
}

fn teardown_map() {
    RESIZE_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old
                .window
                .remove_event_listener_with_callback("resize", old._handler.as_ref().unchecked_ref());
        }
    });
    ACTIVE_MAP.with(|slot| {
        if let Some(controller) = slot.borrow_mut().take() {
            controller.borrow_mut().dispose();
        }
    });
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()?
        .dyn_into::<CanvasRenderingContext2d>()
        .ok()
}

/// Base tiles, parcels and overlays on a single Canvas 2D surface.
#[component]
pub fn MapCanvas() -> impl IntoView {
    let store: ParcelStore = expect_context();
    let HoverTooltip(hover) = expect_context();
    let MapRequests(map_requests) = expect_context();
    let Measure(measure) = expect_context();
    let SidebarOpen(sidebar_open) = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let loaded_tiles: RwSignal<Vec<LoadedTile>> = RwSignal::new(Vec::new());
    let tile_loader = TileLoader::new(loaded_tiles);

    let controller = Rc::new(RefCell::new(MapController::new(INITIAL_VIEW)));
    let layer = Rc::new(RefCell::new(ParcelLayer::new()));
    let selected_shape: Rc<RefCell<Option<ProjectedShape>>> = Rc::new(RefCell::new(None));
    let mount_warned = Rc::new(Cell::new(false));

    ACTIVE_MAP.with(|slot| *slot.borrow_mut() = Some(controller.clone()));

    // Drag state
    let is_dragging = Rc::new(Cell::new(false));
    let drag_start_x = Rc::new(Cell::new(0.0f64));
    let drag_start_y = Rc::new(Cell::new(0.0f64));
    let last_x = Rc::new(Cell::new(0.0f64));
    let last_y = Rc::new(Cell::new(0.0f64));
    // Pinch state
    let pinch_dist = Rc::new(Cell::new(0.0f64));

    let scheduler = RenderScheduler::new({
        let controller = controller.clone();
        let layer = layer.clone();
        let selected_shape = selected_shape.clone();
        move || {
            let Some(canvas) = canvas_ref.get_untracked() else {
                return false;
            };
            let canvas: &HtmlCanvasElement = &canvas;
            let Some(parent) = canvas.parent_element() else {
                return false;
            };
            let w = f64::from(parent.client_width());
            let h = f64::from(parent.client_height());
            if w <= 0.0 || h <= 0.0 {
                return false;
            }
            let now = js_sys::Date::now();

            let change = {
                let mut ctrl = controller.borrow_mut();
                if ctrl.state() == ControllerState::Uninitialized {
                    if let Err(e) = ctrl.mount(w, h, now) {
                        if !mount_warned.replace(true) {
                            web_sys::console::warn_1(&format!("Map init failed: {e}").into());
                        }
                        return false;
                    }
                } else {
                    ctrl.resize(w, h, now);
                }
                ctrl.tick(now)
            };
            if let Some(change) = change {
                store.viewport_changed(change);
            }

            let (view, needs_more) = {
                let ctrl = controller.borrow();
                let Some(view) = ctrl.view().copied() else {
                    return false;
                };
                (view, ctrl.needs_tick())
            };

            tile_loader.request_view(&view);

            let dpr = web_sys::window()
                .map(|w| w.device_pixel_ratio())
                .unwrap_or(1.0)
                .max(1.0);
            let pw = (w * dpr).round() as u32;
            let ph = (h * dpr).round() as u32;
            if canvas.width() != pw || canvas.height() != ph {
                canvas.set_width(pw);
                canvas.set_height(ph);
            }
            let Some(ctx) = context_2d(canvas) else {
                return needs_more;
            };
            let _ = ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
            ctx.set_fill_style_str(MAP_BACKGROUND);
            ctx.fill_rect(0.0, 0.0, w, h);

            loaded_tiles.with_untracked(|tiles| draw_tiles(&ctx, &view, tiles));
            draw_parcels(&ctx, &view, &layer.borrow());
            if let Some(shape) = selected_shape.borrow().as_ref() {
                draw_selection(&ctx, &view, shape);
            }
            measure.with_untracked(|tool| draw_measure(&ctx, &view, tool));
            draw_attribution(&ctx, w, h);

            needs_more
        }
    });
    let scheduler = Rc::new(scheduler);

    // First paint once the canvas exists.
    let sched_init = scheduler.clone();
    Effect::new(move || {
        if canvas_ref.get().is_some() {
            sched_init.mark_dirty();
        }
    });

    // Rebuild the parcel layer whenever the collection or filter changes.
    let sched_layer = scheduler.clone();
    Effect::new({
        let layer = layer.clone();
        let controller = controller.clone();
        move || {
            let update = store.layer_update.get();
            let collection = store.displayed();
            let regions = store.regions_snapshot();
            let fit = layer
                .borrow_mut()
                .reconcile(collection, &regions, update.cause);
            hover.set(None);
            if let Some(fit) = fit {
                controller
                    .borrow_mut()
                    .fit_bounds(fit.bounds, js_sys::Date::now());
            }
            sched_layer.mark_dirty();
        }
    });

    let sched_selected = scheduler.clone();
    Effect::new({
        let selected_shape = selected_shape.clone();
        move || {
            let shape = store
                .selected
                .with(|r| r.as_ref().map(|r| ProjectedShape::from_polygon(&r.geometry)));
            *selected_shape.borrow_mut() = shape;
            sched_selected.mark_dirty();
        }
    });

    // Tile arrivals and measurement edits only need a repaint.
    let sched_repaint = scheduler.clone();
    Effect::new(move || {
        loaded_tiles.track();
        measure.track();
        sched_repaint.mark_dirty();
    });

    let sched_requests = scheduler.clone();
    Effect::new({
        let layer = layer.clone();
        let controller = controller.clone();
        move || {
            let pending = map_requests.get();
            if pending.is_empty() {
                return;
            }
            map_requests.set(Vec::new());
            let now = js_sys::Date::now();
            for request in pending {
                match request {
                    MapRequest::Focus(target) => controller.borrow_mut().focus(target, now),
                    MapRequest::FitVisible => {
                        let bounds = layer.borrow().visible_bounds();
                        if let Some(bounds) = bounds {
                            controller.borrow_mut().fit_bounds(bounds, now);
                        }
                    }
                    MapRequest::ClearHover => {
                        layer.borrow_mut().clear_hover();
                        hover.set(None);
                    }
                }
            }
            sched_requests.mark_dirty();
        }
    });

    // Window resize -> repaint (the frame re-reads the container size).
    let sched_resize = scheduler.clone();
    Effect::new(move || {
        let Some(window) = web_sys::window() else {
            return;
        };
        RESIZE_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "resize",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });
        let sched = sched_resize.clone();
        let handler = Closure::<dyn Fn()>::new(move || sched.mark_dirty());
        if window
            .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            RESIZE_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(ResizeBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    on_cleanup(teardown_map);

    // --- Input handlers ---

    let local_point = move |client_x: f64, client_y: f64| -> (f64, f64) {
        canvas_ref
            .get_untracked()
            .map(|el| {
                let rect = el.get_bounding_client_rect();
                (client_x - rect.left(), client_y - rect.top())
            })
            .unwrap_or((client_x, client_y))
    };

    let on_wheel = {
        let controller = controller.clone();
        let scheduler = scheduler.clone();
        move |e: WheelEvent| {
            e.prevent_default();
            let mut delta_px = e.delta_y();
            if e.delta_mode() == WheelEvent::DOM_DELTA_LINE {
                delta_px *= WHEEL_LINE_PX;
            }
            let (x, y) = local_point(f64::from(e.client_x()), f64::from(e.client_y()));
            controller.borrow_mut().zoom_at(
                -delta_px / WHEEL_PX_PER_ZOOM_LEVEL,
                x,
                y,
                js_sys::Date::now(),
            );
            scheduler.mark_dirty();
        }
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        let layer = layer.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            if layer.borrow_mut().clear_hover() {
                hover.set(None);
            }
            drag_start_x.set(f64::from(e.client_x()));
            drag_start_y.set(f64::from(e.client_y()));
            last_x.set(f64::from(e.client_x()));
            last_y.set(f64::from(e.client_y()));

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        let controller = controller.clone();
        let layer = layer.clone();
        let scheduler = scheduler.clone();
        move |e: PointerEvent| {
            let cx = f64::from(e.client_x());
            let cy = f64::from(e.client_y());
            if is_dragging.get() {
                let dx = cx - last_x.get();
                let dy = cy - last_y.get();
                last_x.set(cx);
                last_y.set(cy);
                controller
                    .borrow_mut()
                    .pan_by(dx, dy, js_sys::Date::now());
                scheduler.mark_dirty();
                return;
            }

            let Some(view) = controller.borrow().view().copied() else {
                return;
            };
            let (x, y) = local_point(cx, cy);
            let changed = layer.borrow_mut().hover_at(&view, x, y);
            if changed {
                let popup = layer.borrow().popup();
                hover.set(popup.map(|p| (p, cx, cy)));
                scheduler.mark_dirty();
            } else if hover.with_untracked(Option::is_some) {
                hover.update(|h| {
                    if let Some((_, hx, hy)) = h {
                        *hx = cx;
                        *hy = cy;
                    }
                });
            }

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                let cursor = if measure.with_untracked(MeasureTool::is_active) {
                    "crosshair"
                } else if hover.with_untracked(Option::is_some) {
                    "pointer"
                } else {
                    "grab"
                };
                el.style().set_property("cursor", cursor).ok();
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_click = {
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        let controller = controller.clone();
        let layer = layer.clone();
        move |e: MouseEvent| {
            let dx = (f64::from(e.client_x()) - drag_start_x.get()).abs();
            let dy = (f64::from(e.client_y()) - drag_start_y.get()).abs();
            if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
                return;
            }
            let Some(view) = controller.borrow().view().copied() else {
                return;
            };
            let (x, y) = local_point(f64::from(e.client_x()), f64::from(e.client_y()));

            if measure.with_untracked(MeasureTool::is_active) {
                let point = view.screen_to_latlng(x, y);
                measure.update(|tool| {
                    tool.add_point(point);
                });
                return;
            }

            let selection = layer.borrow().click_at(&view, x, y);
            if let Some(selection) = selection {
                store.select(&selection.record.id);
                if !sidebar_open.get_untracked() {
                    sidebar_open.set(true);
                }
            }
        }
    };

    let on_pointer_leave = {
        let layer = layer.clone();
        let scheduler = scheduler.clone();
        move |_: PointerEvent| {
            if layer.borrow_mut().clear_hover() {
                hover.set(None);
                scheduler.mark_dirty();
            }
        }
    };

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = f64::from(t1.client_x() - t0.client_x());
                let dy = f64::from(t1.client_y() - t0.client_y());
                pinch_dist.set((dx * dx + dy * dy).sqrt());
            }
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        let controller = controller.clone();
        let scheduler = scheduler.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = f64::from(t1.client_x() - t0.client_x());
                let dy = f64::from(t1.client_y() - t0.client_y());
                let new_dist = (dx * dx + dy * dy).sqrt();
                let old_dist = pinch_dist.get();

                if old_dist > 0.0 && new_dist > 0.0 {
                    let mid_x = f64::from(t0.client_x() + t1.client_x()) / 2.0;
                    let mid_y = f64::from(t0.client_y() + t1.client_y()) / 2.0;
                    let (x, y) = local_point(mid_x, mid_y);
                    controller.borrow_mut().zoom_at(
                        (new_dist / old_dist).log2(),
                        x,
                        y,
                        js_sys::Date::now(),
                    );
                    scheduler.mark_dirty();
                }

                pinch_dist.set(new_dist);
            }
        }
    };

    view! {
        <div
            style="position: absolute; inset: 0; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
            on:touchstart=on_touch_start
            on:touchmove=on_touch_move
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
        </div>
    }
}

fn on_screen(view: &MapView, shape: &ProjectedShape) -> bool {
    let (x0, y0) = view.world_to_screen(shape.min_x, shape.min_y);
    let (x1, y1) = view.world_to_screen(shape.max_x, shape.max_y);
    x1 >= 0.0 && y1 >= 0.0 && x0 <= view.width && y0 <= view.height
}

fn trace_shape(ctx: &CanvasRenderingContext2d, view: &MapView, shape: &ProjectedShape) {
    ctx.begin_path();
    for ring in &shape.rings {
        for (i, &(wx, wy)) in ring.iter().enumerate() {
            let (sx, sy) = view.world_to_screen(wx, wy);
            if i == 0 {
                ctx.move_to(sx, sy);
            } else {
                ctx.line_to(sx, sy);
            }
        }
        ctx.close_path();
    }
}

fn draw_tiles(ctx: &CanvasRenderingContext2d, view: &MapView, tiles: &[LoadedTile]) {
    let tz = tile_zoom(view.zoom);
    let mut order: Vec<&LoadedTile> = tiles.iter().filter(|t| t.key.z <= tz).collect();
    // Coarser tiles first so the current zoom level paints over them.
    order.sort_by_key(|t| t.key.z);

    let scale = view.scale();
    for tile in order {
        let (wx, wy, size) = tile.key.world_rect();
        let (sx, sy) = view.world_to_screen(wx, wy);
        let side = size * scale;
        if sx + side < 0.0 || sy + side < 0.0 || sx > view.width || sy > view.height {
            continue;
        }
        // Half-pixel overdraw hides seams between neighbours.
        let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
            &tile.image,
            sx.floor(),
            sy.floor(),
            (side + 0.5).ceil(),
            (side + 0.5).ceil(),
        );
    }
}

fn draw_parcels(ctx: &CanvasRenderingContext2d, view: &MapView, layer: &ParcelLayer) {
    ctx.set_line_join("round");
    for (shape, style) in layer.paint_items() {
        if shape.is_empty() || !on_screen(view, shape) {
            continue;
        }
        let (fill, stroke) = style_css(&style);
        trace_shape(ctx, view, shape);
        ctx.set_fill_style_str(&fill);
        ctx.fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd);
        ctx.set_stroke_style_str(&stroke);
        ctx.set_line_width(style.weight);
        ctx.stroke();
    }
}

fn draw_selection(ctx: &CanvasRenderingContext2d, view: &MapView, shape: &ProjectedShape) {
    if shape.is_empty() || !on_screen(view, shape) {
        return;
    }
    trace_shape(ctx, view, shape);
    ctx.set_stroke_style_str("rgba(255,255,255,0.95)");
    ctx.set_line_width(3.0);
    let dash = js_sys::Array::of2(&JsValue::from_f64(6.0), &JsValue::from_f64(4.0));
    let _ = ctx.set_line_dash(&dash);
    ctx.stroke();
    let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_measure(ctx: &CanvasRenderingContext2d, view: &MapView, tool: &MeasureTool) {
    let points: Vec<(f64, f64)> = tool
        .points()
        .iter()
        .map(|&p| view.latlng_to_screen(p))
        .collect();
    let Some(&(last_x, last_y)) = points.last() else {
        return;
    };
    let (r, g, b) = MEASURE_COLOR;

    if points.len() >= 2 {
        ctx.begin_path();
        for (i, &(x, y)) in points.iter().enumerate() {
            if i == 0 {
                ctx.move_to(x, y);
            } else {
                ctx.line_to(x, y);
            }
        }
        if tool.mode() == MeasureMode::Area && points.len() >= 3 {
            ctx.close_path();
            ctx.set_fill_style_str(&rgba_css(r, g, b, 0.15));
            ctx.fill();
        }
        ctx.set_stroke_style_str(&rgba_css(r, g, b, 0.9));
        ctx.set_line_width(2.0);
        ctx.stroke();
    }

    ctx.set_fill_style_str(&rgba_css(255, 255, 255, 1.0));
    ctx.set_stroke_style_str(&rgba_css(r, g, b, 1.0));
    ctx.set_line_width(2.0);
    for &(x, y) in &points {
        ctx.begin_path();
        let _ = ctx.arc(x, y, 4.0, 0.0, TAU);
        ctx.fill();
        ctx.stroke();
    }

    if let Some(label) = tool.result() {
        ctx.set_font("600 12px Inter, system-ui, sans-serif");
        let text_w = ctx.measure_text(&label).map(|m| m.width()).unwrap_or(60.0);
        let (bx, by) = (last_x + 10.0, last_y - 26.0);
        ctx.set_fill_style_str("rgba(19,22,31,0.9)");
        ctx.fill_rect(bx, by, text_w + 12.0, 20.0);
        ctx.set_fill_style_str("#ffffff");
        let _ = ctx.fill_text(&label, bx + 6.0, by + 14.0);
    }
}

fn draw_attribution(ctx: &CanvasRenderingContext2d, w: f64, h: f64) {
    ctx.set_font("11px Inter, system-ui, sans-serif");
    let text_w = ctx
        .measure_text(TILE_ATTRIBUTION)
        .map(|m| m.width())
        .unwrap_or(150.0);
    ctx.set_fill_style_str("rgba(255,255,255,0.75)");
    ctx.fill_rect(w - text_w - 10.0, h - 18.0, text_w + 10.0, 18.0);
    ctx.set_fill_style_str("#333333");
    let _ = ctx.fill_text(TILE_ATTRIBUTION, w - text_w - 5.0, h - 5.0);
}
