#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use js_sys::Reflect;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

use crate::config::{MAX_ZOOM, TILE_URL_TEMPLATE};
use crate::viewport::{MapView, TILE_SIZE};

const TILE_CONCURRENCY: usize = 6;
const MAX_CACHED_TILES: usize = 384;
const ONLOAD_HANDLE_KEY: &str = "__landviewTileOnload";
const ONERROR_HANDLE_KEY: &str = "__landviewTileOnerror";

/// Slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn url(&self) -> String {
        TILE_URL_TEMPLATE
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }

    /// Top-left corner and side length in zoom-0 world coordinates.
    pub fn world_rect(&self) -> (f64, f64, f64) {
        let size = TILE_SIZE / f64::from(self.z).exp2();
        (f64::from(self.x) * size, f64::from(self.y) * size, size)
    }
}

/// Tile zoom to fetch for a fractional map zoom.
pub fn tile_zoom(view_zoom: f64) -> u32 {
    view_zoom.round().clamp(0.0, MAX_ZOOM) as u32
}

/// Tiles covering the view, nearest to the center first.
pub fn visible_tiles(view: &MapView) -> Vec<TileKey> {
    let z = tile_zoom(view.zoom);
    let n = 1u32 << z;
    let tile_world = TILE_SIZE / f64::from(n);

    let (x0, y0) = view.screen_to_world(0.0, 0.0);
    let (x1, y1) = view.screen_to_world(view.width, view.height);
    let index = |w: f64| (w / tile_world).floor().clamp(0.0, f64::from(n - 1)) as u32;
    let (col_start, col_end) = (index(x0), index(x1));
    let (row_start, row_end) = (index(y0), index(y1));

    let (cx, cy) = view.screen_to_world(view.width / 2.0, view.height / 2.0);
    let mut keys: Vec<TileKey> = (row_start..=row_end)
        .flat_map(|y| (col_start..=col_end).map(move |x| TileKey { z, x, y }))
        .collect();
    keys.sort_by(|a, b| {
        let dist = |k: &TileKey| {
            let (tx, ty, size) = k.world_rect();
            let dx = tx + size / 2.0 - cx;
            let dy = ty + size / 2.0 - cy;
            dx * dx + dy * dy
        };
        dist(a).total_cmp(&dist(b)).then_with(|| a.cmp(b))
    });
    keys
}

/// A decoded base-map tile.
#[derive(Clone)]
pub struct LoadedTile {
    pub key: TileKey,
    pub image: HtmlImageElement,
}

/// Loads base tiles through a bounded queue and publishes them to a signal.
///
/// Requesting a new view drops queued (not yet started) tiles from the
/// previous one, so a fast zoom does not wait behind stale downloads.
#[derive(Clone)]
pub struct TileLoader {
    tiles: RwSignal<Vec<LoadedTile>>,
    requested: Rc<RefCell<HashSet<TileKey>>>,
    queue: Rc<RefCell<VecDeque<TileKey>>>,
    in_flight: Rc<Cell<usize>>,
}

impl TileLoader {
    pub fn new(tiles: RwSignal<Vec<LoadedTile>>) -> Self {
        Self {
            tiles,
            requested: Rc::new(RefCell::new(HashSet::new())),
            queue: Rc::new(RefCell::new(VecDeque::new())),
            in_flight: Rc::new(Cell::new(0)),
        }
    }

    pub fn request_view(&self, view: &MapView) {
        let wanted = visible_tiles(view);
        {
            let mut requested = self.requested.borrow_mut();
            let mut queue = self.queue.borrow_mut();
            for stale in queue.drain(..) {
                requested.remove(&stale);
            }
            for key in wanted {
                if requested.insert(key) {
                    queue.push_back(key);
                }
            }
        }
        self.pump();
    }

    fn pump(&self) {
        while self.in_flight.get() < TILE_CONCURRENCY {
            let Some(key) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            self.in_flight.set(self.in_flight.get() + 1);

            let next = self.clone();
            let on_done: Rc<dyn Fn()> = Rc::new(move || {
                next.in_flight.set(next.in_flight.get().saturating_sub(1));
                next.pump();
            });
            self.load(key, on_done);
        }
    }

    fn load(&self, key: TileKey, on_done: Rc<dyn Fn()>) {
        let img = match HtmlImageElement::new() {
            Ok(img) => img,
            Err(_) => {
                on_done();
                return;
            }
        };
        img.set_cross_origin(Some("anonymous"));

        let loader = self.clone();
        let img_for_load = img.clone();
        let on_done_load = on_done.clone();
        let onload = Closure::<dyn FnMut()>::new(move || {
            clear_image_handlers(&img_for_load);

            let img_for_decode = img_for_load.clone();
            let on_done_load = on_done_load.clone();
            let loader = loader.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let _ = JsFuture::from(img_for_decode.decode()).await;
                loader.upsert(LoadedTile {
                    key,
                    image: img_for_decode,
                });
                on_done_load();
            });
        });

        let requested = self.requested.clone();
        let img_for_error = img.clone();
        let onerror = Closure::<dyn FnMut()>::new(move || {
            clear_image_handlers(&img_for_error);
            // Allow a later view to retry this tile.
            requested.borrow_mut().remove(&key);
            on_done();
        });

        let onload_js = onload.into_js_value();
        let onerror_js = onerror.into_js_value();
        img.set_onload(Some(onload_js.unchecked_ref()));
        img.set_onerror(Some(onerror_js.unchecked_ref()));
        let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY), &onload_js);
        let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY), &onerror_js);
        img.set_src(&key.url());
    }

    fn upsert(&self, incoming: LoadedTile) {
        let mut evicted = Vec::new();
        self.tiles.update(|loaded| {
            if let Some(existing) = loaded.iter_mut().find(|t| t.key == incoming.key) {
                *existing = incoming;
                return;
            }
            loaded.push(incoming);
            if loaded.len() > MAX_CACHED_TILES {
                let overflow = loaded.len() - MAX_CACHED_TILES;
                evicted.extend(loaded.drain(0..overflow).map(|t| t.key));
            }
        });
        let mut requested = self.requested.borrow_mut();
        for key in evicted {
            requested.remove(&key);
        }
    }
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}
