use std::cell::RefCell;
use std::rc::Rc;

use gloo_storage::Storage;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use landview_shared::format::format_area;
use landview_shared::{
    DerivedStats, FocusRequest, LatLng, ParcelCollection, ParcelRecord, QueryError,
    RegionFilterState, SearchQuery,
};

use crate::api::ParcelApi;
use crate::canvas::MapCanvas;
use crate::colors::region_css;
use crate::config::{FETCH_TIMEOUT_SECS, SETTINGS_STORAGE_KEY, VIEWPORT_LIMIT};
use crate::layer::{HoverPopup, ReconcileCause};
use crate::measure::MeasureTool;
use crate::query::{Completion, LoadState, QueryCoordinator, Ticket};
use crate::session::SessionContext;
use crate::sidebar::Sidebar;
use crate::viewport::ViewportChange;

/// Rows shown in the sidebar listing.
const LISTING_LIMIT: usize = 50;

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
}

#[derive(Clone, Copy)]
pub(crate) struct SidebarOpen(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct Measure(pub RwSignal<MeasureTool>);
/// Hover popup and the client-space pointer position it follows.
#[derive(Clone, Copy)]
pub(crate) struct HoverTooltip(pub RwSignal<Option<(HoverPopup, f64, f64)>>);
#[derive(Clone, Copy)]
pub(crate) struct MapRequests(pub RwSignal<Vec<MapRequest>>);

/// Commands for the map canvas, which exclusively owns the map controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum MapRequest {
    Focus(FocusRequest),
    FitVisible,
    ClearHover,
}

pub(crate) fn request_map(requests: RwSignal<Vec<MapRequest>>, request: MapRequest) {
    requests.update(|pending| pending.push(request));
}

/// Summary row for the sidebar listing.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ListingItem {
    pub id: String,
    pub parcel_id: String,
    pub owner: Option<String>,
    pub region: String,
    pub area: String,
    pub center: Option<LatLng>,
}

impl ListingItem {
    fn from_record(record: &ParcelRecord) -> Self {
        Self {
            id: record.id.clone(),
            parcel_id: record.properties.parcel_id.clone(),
            owner: record.properties.owner_name.clone(),
            region: record.properties.region.clone(),
            area: format_area(record.area_sqm()),
            center: record.center(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct ResultCounts {
    /// Records drawn (enabled regions).
    pub shown: usize,
    /// Records in the last response.
    pub received: usize,
    /// Server-side match count before its limit.
    pub total: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LayerUpdate {
    pub generation: u64,
    pub cause: ReconcileCause,
}

/// Reactive front of the query coordinator.
///
/// The coordinator stays the single owner of query state; every mutation
/// goes through here and is followed by `publish`, which copies the parts
/// the UI renders into signals.
#[derive(Clone, Copy)]
pub(crate) struct ParcelStore {
    coordinator: StoredValue<QueryCoordinator, LocalStorage>,
    api: StoredValue<ParcelApi>,
    pub load_state: RwSignal<LoadState>,
    pub regions: RwSignal<RegionFilterState>,
    pub search: RwSignal<Option<SearchQuery>>,
    pub selected: RwSignal<Option<ParcelRecord>>,
    pub stats: RwSignal<DerivedStats>,
    pub listing: RwSignal<Vec<ListingItem>>,
    pub counts: RwSignal<ResultCounts>,
    pub layer_update: RwSignal<LayerUpdate>,
}

impl ParcelStore {
    fn new(regions: RegionFilterState, api: ParcelApi) -> Self {
        Self {
            regions: RwSignal::new(regions.clone()),
            coordinator: StoredValue::new_local(QueryCoordinator::new(regions, VIEWPORT_LIMIT)),
            api: StoredValue::new(api),
            load_state: RwSignal::new(LoadState::Idle),
            search: RwSignal::new(None),
            selected: RwSignal::new(None),
            stats: RwSignal::new(DerivedStats::default()),
            listing: RwSignal::new(Vec::new()),
            counts: RwSignal::new(ResultCounts::default()),
            layer_update: RwSignal::new(LayerUpdate {
                generation: 0,
                cause: ReconcileCause::FilterChanged,
            }),
        }
    }

    fn run(self, ticket: Ticket) {
        self.publish();
        if ticket.skip_fetch {
            self.finish(ticket.seq, Ok(ParcelCollection::default()));
            return;
        }
        let api = self.api.get_value();
        spawn_local(async move {
            let result = api.fetch(&ticket.intent).await;
            self.finish(ticket.seq, result);
        });
    }

    fn finish(self, seq: u64, result: Result<ParcelCollection, QueryError>) {
        let Some(outcome) = self
            .coordinator
            .try_update_value(|c| c.complete(seq, result))
        else {
            return;
        };
        match outcome {
            Completion::Stale => {
                web_sys::console::info_1(
                    &format!("Dropped stale parcel response #{seq}").into(),
                );
                return;
            }
            Completion::Failed(message) => {
                web_sys::console::warn_1(&format!("Parcel query failed: {message}").into());
            }
            Completion::Applied(kind) => {
                self.bump_layer(ReconcileCause::CollectionReplaced(kind));
            }
        }
        self.publish();
    }

    fn bump_layer(self, cause: ReconcileCause) {
        self.layer_update.update(|u| {
            u.generation = u.generation.wrapping_add(1);
            u.cause = cause;
        });
    }

    fn publish(self) {
        self.coordinator.with_value(|c| {
            let displayed = c.displayed();
            self.load_state.set(c.load_state().clone());
            self.regions.set(c.regions().clone());
            self.search.set(c.active_search().cloned());
            self.selected.set(c.selected_record().cloned());
            self.stats.set(c.derived_stats());
            self.listing.set(
                c.visible_records()
                    .take(LISTING_LIMIT)
                    .map(ListingItem::from_record)
                    .collect(),
            );
            self.counts.set(ResultCounts {
                shown: c.visible_records().count(),
                received: displayed.len(),
                total: displayed.total,
            });
        });
    }

    fn submit_with(self, f: impl FnOnce(&mut QueryCoordinator) -> Option<Ticket>) {
        if let Some(ticket) = self.coordinator.try_update_value(f).flatten() {
            self.run(ticket);
        }
    }

    pub fn start(self) {
        self.submit_with(|c| Some(c.start()));
    }

    pub fn toggle_region(self, name: &str) {
        let Some(ticket) = self
            .coordinator
            .try_update_value(|c| c.toggle_region(name))
            .flatten()
        else {
            return;
        };
        self.bump_layer(ReconcileCause::FilterChanged);
        self.run(ticket);
    }

    pub fn search(self, query: SearchQuery) {
        self.submit_with(|c| Some(c.search(query)));
    }

    pub fn clear_search(self) {
        self.submit_with(QueryCoordinator::clear_search);
    }

    pub fn retry(self) {
        self.submit_with(QueryCoordinator::retry);
    }

    pub fn viewport_changed(self, change: ViewportChange) {
        self.submit_with(|c| c.on_viewport_change(change));
    }

    pub fn select(self, id: &str) {
        if self.coordinator.try_update_value(|c| c.select(id)) == Some(true) {
            self.publish();
        }
    }

    pub fn clear_selection(self) {
        self.coordinator.update_value(QueryCoordinator::clear_selection);
        self.selected.set(None);
    }

    pub fn displayed(self) -> Rc<ParcelCollection> {
        self.coordinator
            .try_with_value(QueryCoordinator::displayed)
            .unwrap_or_default()
    }

    pub fn regions_snapshot(self) -> RegionFilterState {
        self.coordinator
            .try_with_value(|c| c.regions().clone())
            .unwrap_or_default()
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct Settings {
    regions: RegionFilterState,
    sidebar_open: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            regions: RegionFilterState::new(),
            sidebar_open: true,
        }
    }
}

#[component]
pub fn App() -> impl IntoView {
    let saved: Settings =
        gloo_storage::LocalStorage::get(SETTINGS_STORAGE_KEY).unwrap_or_default();
    let mut regions = RegionFilterState::new();
    regions.restore_from(&saved.regions);

    let api = ParcelApi::new(SessionContext::from_local_storage(), FETCH_TIMEOUT_SECS);
    let store = ParcelStore::new(regions, api);
    let sidebar_open: RwSignal<bool> = RwSignal::new(saved.sidebar_open);
    let measure: RwSignal<MeasureTool> = RwSignal::new(MeasureTool::new());
    let hover: RwSignal<Option<(HoverPopup, f64, f64)>> = RwSignal::new(None);
    let map_requests: RwSignal<Vec<MapRequest>> = RwSignal::new(Vec::new());

    provide_context(store);
    provide_context(SidebarOpen(sidebar_open));
    provide_context(Measure(measure));
    provide_context(HoverTooltip(hover));
    provide_context(MapRequests(map_requests));

    Effect::new(move || {
        let settings = Settings {
            regions: store.regions.get(),
            sidebar_open: sidebar_open.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_STORAGE_KEY, &settings);
    });

    // Initial region query on mount.
    Effect::new(move || {
        store.start();
    });

    // Global keyboard shortcuts
    Effect::new(move || {
        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler = wasm_bindgen::closure::Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(
            move |e: web_sys::KeyboardEvent| {
                let key = e.key();
                let in_field = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    .is_some_and(|el| matches!(el.tag_name().as_str(), "INPUT" | "SELECT" | "TEXTAREA"));

                if key == "Escape" {
                    store.clear_selection();
                    request_map(map_requests, MapRequest::ClearHover);
                    if in_field
                        && let Some(el) = e
                            .target()
                            .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    {
                        let _ = el.blur();
                    }
                    return;
                }
                if in_field || e.ctrl_key() || e.meta_key() || e.alt_key() {
                    return;
                }

                match key.as_str() {
                    "/" => {
                        e.prevent_default();
                        sidebar_open.set(true);
                        focus_search_input();
                    }
                    "r" => request_map(map_requests, MapRequest::FitVisible),
                    _ => {}
                }
            },
        );

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }

        on_cleanup(|| {
            KEYDOWN_BINDING.with(|slot| {
                if let Some(old) = slot.borrow_mut().take() {
                    let _ = old.window.remove_event_listener_with_callback(
                        "keydown",
                        old._handler.as_ref().unchecked_ref(),
                    );
                }
            });
        });
    });

    view! {
        <div style="width: 100%; height: 100%; position: relative; display: flex;">
            <div style="flex: 1; height: 100%; position: relative; overflow: hidden; background: #e8e4da;">
                <MapCanvas />
                <LoadBadge />
            </div>
            <div
                class="sidebar-wrapper"
                style="position: relative; height: 100%; flex-shrink: 0; transition: width 0.2s ease;"
                style:width=move || if sidebar_open.get() { "360px" } else { "0px" }
            >
                <SidebarToggle />
                <Sidebar />
            </div>
        </div>
        <Tooltip />
    }
}

fn focus_search_input() {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    if let Ok(Some(el)) = document.query_selector("[data-search-input]")
        && let Ok(input) = el.dyn_into::<web_sys::HtmlElement>()
    {
        let _ = input.focus();
    }
}

/// Toggle button for showing/hiding the sidebar. Attached to the sidebar's left edge.
#[component]
fn SidebarToggle() -> impl IntoView {
    let SidebarOpen(sidebar_open) = expect_context();

    view! {
        <button
            title=move || if sidebar_open.get() { "Hide sidebar" } else { "Show sidebar" }
            style="position: absolute; top: 16px; left: -44px; z-index: 11; width: 32px; height: 32px; background: #13161f; border: 1px solid #282c3e; border-radius: 6px; cursor: pointer; display: flex; align-items: center; justify-content: center; color: #9a9590; font-size: 1.1rem; line-height: 1;"
            on:click=move |_| sidebar_open.update(|v| *v = !*v)
        >
            {move || if sidebar_open.get() { "\u{00BB}" } else { "\u{00AB}" }}
        </button>
    }
}

/// Loading and error indicator over the map.
#[component]
fn LoadBadge() -> impl IntoView {
    let store: ParcelStore = expect_context();

    view! {
        {move || match store.load_state.get() {
            LoadState::Loading => view! {
                <div style="position: absolute; top: 12px; left: 50%; transform: translateX(-50%); z-index: 5; background: #13161f; color: #e2e0d8; border: 1px solid #282c3e; border-radius: 14px; padding: 5px 14px; font-family: 'Inter', system-ui, sans-serif; font-size: 0.78rem;">
                    "Loading parcels\u{2026}"
                </div>
            }.into_any(),
            LoadState::Failed(message) => view! {
                <div style="position: absolute; top: 12px; left: 50%; transform: translateX(-50%); z-index: 5; background: #2a1416; color: #f3b4b4; border: 1px solid #6b2a2e; border-radius: 6px; padding: 6px 12px; font-family: 'Inter', system-ui, sans-serif; font-size: 0.78rem; display: flex; gap: 10px; align-items: center;">
                    <span>{message}</span>
                    <button
                        style="background: #6b2a2e; color: #fff; border: none; border-radius: 4px; padding: 3px 10px; cursor: pointer; font-size: 0.75rem;"
                        on:click=move |_| store.retry()
                    >"Retry"</button>
                </div>
            }.into_any(),
            LoadState::Idle | LoadState::Loaded => ().into_any(),
        }}
    }
}

/// Popup that follows the pointer while a parcel is hovered.
#[component]
fn Tooltip() -> impl IntoView {
    let HoverTooltip(hover) = expect_context();

    view! {
        {move || {
            let Some((popup, x, y)) = hover.get() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let accent = region_css(&popup.region, 0.85);
            view! {
                <div
                    style:left=format!("{}px", x + 16.0)
                    style:top=format!("{}px", y - 8.0)
                    style="position: fixed; pointer-events: none; z-index: 100; background: #161921; border: 1px solid #282c3e; border-radius: 6px; overflow: hidden; box-shadow: 0 4px 16px rgba(0,0,0,0.5); max-width: 240px; display: flex; flex-direction: row;"
                >
                    <div style={format!("width: 3px; flex-shrink: 0; background: {accent};")} />
                    <div style="padding: 8px 10px; flex: 1; font-family: 'Inter', system-ui, sans-serif;">
                        <div style="font-size: 0.85rem; font-weight: 700; color: #e2e0d8;">{popup.parcel_id}</div>
                        <div style="font-size: 0.72rem; color: #9a9590; margin-top: 2px;">{popup.region}</div>
                        <div style="font-size: 0.72rem; color: #e2e0d8; margin-top: 5px; padding-top: 4px; border-top: 1px solid rgba(40,44,62,0.5);">
                            {popup.owner.unwrap_or_else(|| "Unknown owner".to_string())}
                        </div>
                        <div style="font-size: 0.7rem; color: #9a9590; font-family: 'JetBrains Mono', monospace; margin-top: 2px;">{popup.area}</div>
                    </div>
                </div>
            }.into_any()
        }}
    }
}
