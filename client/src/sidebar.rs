use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;

use landview_shared::export::{export_file_name, to_csv, to_geojson};
use landview_shared::format::{format_area, format_currency, format_date, format_distance};
use landview_shared::{ParcelRecord, SearchQuery};

use crate::app::{MapRequest, MapRequests, ParcelStore, SidebarOpen, request_map};
use crate::colors::region_css;
use crate::config::LISTING_FOCUS_ZOOM;
use crate::controls::{MeasureTools, RegionFilter, SearchBar};
use crate::query::LoadState;

const SECTION_STYLE: &str = "padding: 12px 24px; border-bottom: 1px solid #282c3e;";
const SECTION_TITLE_STYLE: &str = "font-family: 'Inter', system-ui, sans-serif; font-size: 0.66rem; color: #5a5860; text-transform: uppercase; letter-spacing: 0.12em; margin-bottom: 8px;";

/// Save `contents` through a temporary object URL.
fn download(file_name: &str, mime: &str, contents: &str) -> Result<(), JsValue> {
    let parts = js_sys::Array::of1(&JsValue::from_str(contents));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime);
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let anchor = document
        .create_element("a")?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(JsValue::from)?;
    anchor.set_href(&url);
    anchor.set_download(file_name);
    anchor.click();
    web_sys::Url::revoke_object_url(&url)
}

fn export_csv(record: &ParcelRecord) {
    let csv = to_csv(std::iter::once(record));
    if let Err(e) = download(&export_file_name(record, "csv"), "text/csv", &csv) {
        web_sys::console::warn_2(&"CSV export failed".into(), &e);
    }
}

fn export_geojson(record: &ParcelRecord) {
    let json = match to_geojson(record) {
        Ok(json) => json,
        Err(e) => {
            web_sys::console::warn_1(&format!("GeoJSON export failed: {e}").into());
            return;
        }
    };
    if let Err(e) = download(
        &export_file_name(record, "geojson"),
        "application/geo+json",
        &json,
    ) {
        web_sys::console::warn_2(&"GeoJSON export failed".into(), &e);
    }
}

/// Sidebar with search, filters, selected parcel details, stats and listing.
#[component]
pub fn Sidebar() -> impl IntoView {
    let store: ParcelStore = expect_context();
    let SidebarOpen(sidebar_open) = expect_context();

    view! {
        <div
            class="sidebar-inner"
            style:display=move || if sidebar_open.get() { "flex" } else { "none" }
            style="width: 100%; min-width: 100%; height: 100%; background: #13161f; border-left: 1px solid #282c3e; display: flex; flex-direction: column; z-index: 10; box-shadow: -4px 0 20px rgba(0,0,0,0.4);"
        >
            <SidebarHeader />
            <SearchBar />
            <div data-sidebar-scroll="" class="scrollbar-thin" style="flex: 1; overflow-y: auto;">
                {move || store.selected.get().map(|record| view! { <ParcelDetails record=record /> })}
                <RegionFilter />
                <MeasureTools />
                <StatsPanel />
                <ParcelListing />
            </div>
            <ResultSummary />
        </div>
    }
}

#[component]
fn SidebarHeader() -> impl IntoView {
    view! {
        <div style="padding: 20px 24px 16px; border-bottom: 1px solid #282c3e;">
            <div style="display: flex; align-items: baseline; gap: 10px;">
                <div style="font-family: 'Inter', system-ui, sans-serif; font-size: 1.2rem; font-weight: 700; letter-spacing: 0.06em; color: #e2e0d8;">"Land Parcels"</div>
                <div style="font-family: 'JetBrains Mono', monospace; font-size: 0.58rem; color: #3a3f5c; background: #1a1d2a; padding: 1px 6px; border-radius: 3px; border: 1px solid #282c3e; letter-spacing: 0.04em;">"v0.1"</div>
            </div>
            <div style="font-family: 'Inter', system-ui, sans-serif; font-size: 0.72rem; color: #5a5860; margin-top: 3px; letter-spacing: 0.08em;">"Tanzania cadastral viewer"</div>
        </div>
    }
}

fn search_caption(query: &SearchQuery) -> String {
    format!("{} contains \u{201C}{}\u{201D}", query.field().label(), query.value())
}

/// Footer line: how many parcels are drawn out of how many matched.
#[component]
fn ResultSummary() -> impl IntoView {
    let store: ParcelStore = expect_context();

    let summary = move || {
        let counts = store.counts.get();
        if store.load_state.with(|s| matches!(s, LoadState::Idle)) {
            return "No parcels loaded".to_string();
        }
        let mut line = format!("Showing {} of {} parcels", counts.shown, counts.total);
        if counts.received < counts.total {
            line.push_str(&format!(" ({} loaded)", counts.received));
        }
        line
    };

    view! {
        <div style="padding: 10px 16px; border-top: 1px solid #282c3e; font-family: 'JetBrains Mono', monospace; font-size: 0.68rem; color: #6a6870; display: flex; flex-direction: column; gap: 2px;">
            <span>{summary}</span>
            {move || store.search.get().map(|q| view! {
                <span style="color: #9a9590;">{search_caption(&q)}</span>
            })}
        </div>
    }
}

#[component]
fn DetailRow(label: &'static str, value: Option<String>) -> impl IntoView {
    view! {
        <div style="display: flex; justify-content: space-between; gap: 12px; padding: 5px 0; border-bottom: 1px solid rgba(40,44,62,0.5); font-family: 'Inter', system-ui, sans-serif; font-size: 0.8rem;">
            <span style="color: #9a9590; flex-shrink: 0;">{label}</span>
            <span style="color: #e2e0d8; text-align: right; word-break: break-word;">
                {value.unwrap_or_else(|| "\u{2014}".to_string())}
            </span>
        </div>
    }
}

/// Attribute sheet for the selected parcel.
#[component]
fn ParcelDetails(record: ParcelRecord) -> impl IntoView {
    let store: ParcelStore = expect_context();
    let accent = region_css(record.region(), 0.9);
    let p = record.properties.clone();

    let area = Some(format_area(record.area_sqm()));
    let perimeter = Some(format_distance(record.perimeter_m()));
    let valuation = p.valuation.filter(|v| *v > 0.0).map(format_currency);

    let record_csv = record.clone();
    let record_json = record.clone();

    view! {
        <div style=SECTION_STYLE>
            <div style="display: flex; align-items: center; justify-content: space-between; margin-bottom: 8px;">
                <div style="display: flex; align-items: center; gap: 8px;">
                    <span style={format!("width: 4px; height: 22px; border-radius: 2px; background: {accent};")} />
                    <div>
                        <div style="font-family: 'Inter', system-ui, sans-serif; font-size: 1rem; font-weight: 700; color: #e2e0d8;">{p.parcel_id.clone()}</div>
                        <div style="font-family: 'Inter', system-ui, sans-serif; font-size: 0.72rem; color: #9a9590;">{p.region.clone()}</div>
                    </div>
                </div>
                <button
                    title="Close (Esc)"
                    style="background: none; border: none; color: #5a5860; cursor: pointer; font-size: 1.1rem;"
                    on:click=move |_| store.clear_selection()
                >"\u{00D7}"</button>
            </div>
            <DetailRow label="Owner" value=p.owner_name.clone() />
            <DetailRow label="Owner ID" value=p.owner_id.clone() />
            <DetailRow label="Address" value=p.address.clone() />
            <DetailRow label="District" value=p.district.clone() />
            <DetailRow label="Ward" value=p.ward.clone() />
            <DetailRow label="Land use" value=p.land_use.clone() />
            <DetailRow label="Zoning" value=p.zoning.clone() />
            <DetailRow label="Area" value=area />
            <DetailRow label="Perimeter" value=perimeter />
            <DetailRow label="Valuation" value=valuation />
            <DetailRow label="Registered" value=format_date(p.created_at.as_deref()) />
            <DetailRow label="Updated" value=format_date(p.updated_at.as_deref()) />
            <div style="display: flex; gap: 8px; margin-top: 10px;">
                <button
                    style="flex: 1; background: #1a1d2a; color: #e2e0d8; border: 1px solid #282c3e; border-radius: 4px; padding: 6px 10px; cursor: pointer; font-size: 0.76rem;"
                    on:click=move |_| export_csv(&record_csv)
                >"Export CSV"</button>
                <button
                    style="flex: 1; background: #1a1d2a; color: #e2e0d8; border: 1px solid #282c3e; border-radius: 4px; padding: 6px 10px; cursor: pointer; font-size: 0.76rem;"
                    on:click=move |_| export_geojson(&record_json)
                >"Export GeoJSON"</button>
            </div>
        </div>
    }
}

#[component]
fn DistributionBar(label: String, count: usize, percent: f64, color: String) -> impl IntoView {
    view! {
        <div style="margin-bottom: 6px;">
            <div style="display: flex; justify-content: space-between; font-family: 'Inter', system-ui, sans-serif; font-size: 0.74rem; color: #e2e0d8;">
                <span>{label}</span>
                <span style="color: #9a9590; font-family: 'JetBrains Mono', monospace;">{format!("{count} \u{00B7} {percent:.0}%")}</span>
            </div>
            <div style="height: 4px; background: #1a1d2a; border-radius: 2px; margin-top: 3px; overflow: hidden;">
                <div style={format!("height: 100%; width: {percent:.1}%; background: {color};")} />
            </div>
        </div>
    }
}

/// Aggregates over the parcels currently drawn.
#[component]
fn StatsPanel() -> impl IntoView {
    let store: ParcelStore = expect_context();

    view! {
        <div style=SECTION_STYLE>
            <div style=SECTION_TITLE_STYLE>"Statistics"</div>
            {move || {
                let stats = store.stats.get();
                if stats.total_count == 0 {
                    return view! {
                        <div style="font-family: 'Inter', system-ui, sans-serif; font-size: 0.78rem; color: #5a5860;">"No parcels in view"</div>
                    }.into_any();
                }
                let by_region = stats
                    .count_by_region
                    .iter()
                    .map(|(name, &count)| view! {
                        <DistributionBar
                            label=name.clone()
                            count=count
                            percent=stats.percent_of_total(count)
                            color=region_css(name, 0.8)
                        />
                    })
                    .collect_view();
                let by_land_use = stats
                    .land_use_ranked()
                    .into_iter()
                    .map(|(name, count)| view! {
                        <DistributionBar
                            label=name.to_string()
                            count=count
                            percent=stats.percent_of_total(count)
                            color="#9a9590".to_string()
                        />
                    })
                    .collect_view();
                let valuation = (stats.total_valuation > 0.0)
                    .then(|| format_currency(stats.total_valuation));
                view! {
                    <div>
                        <DetailRow label="Parcels" value=Some(stats.total_count.to_string()) />
                        <DetailRow label="Total area" value=Some(format_area(stats.total_area_sqm)) />
                        <DetailRow label="Average area" value=Some(format_area(stats.average_area_sqm)) />
                        <DetailRow label="Total valuation" value=valuation />
                        <div style="margin-top: 10px;">{by_region}</div>
                        <div style="margin-top: 10px;">{by_land_use}</div>
                    </div>
                }.into_any()
            }}
        </div>
    }
}

/// First page of drawn parcels; a click centers the map on one.
#[component]
fn ParcelListing() -> impl IntoView {
    let store: ParcelStore = expect_context();
    let MapRequests(map_requests) = expect_context();

    view! {
        <div style=SECTION_STYLE>
            <div style=SECTION_TITLE_STYLE>"Parcels"</div>
            {move || {
                let items = store.listing.get();
                if items.is_empty() {
                    return view! {
                        <div style="font-family: 'Inter', system-ui, sans-serif; font-size: 0.78rem; color: #5a5860;">"Nothing to list"</div>
                    }.into_any();
                }
                items
                    .into_iter()
                    .map(|item| {
                        let center = item.center;
                        let accent = region_css(&item.region, 0.9);
                        view! {
                            <div
                                style="display: flex; gap: 8px; padding: 7px 8px; border-radius: 4px; cursor: pointer; transition: background 0.15s;"
                                on:click=move |_| {
                                    if let Some(c) = center {
                                        request_map(
                                            map_requests,
                                            MapRequest::Focus(landview_shared::FocusRequest::new(
                                                c.lat,
                                                c.lng,
                                                LISTING_FOCUS_ZOOM,
                                            )),
                                        );
                                    }
                                }
                                on:mouseenter=|e| {
                                    if let Some(el) = e.target().and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok()) {
                                        el.style().set_property("background", "#232738").ok();
                                    }
                                }
                                on:mouseleave=|e| {
                                    if let Some(el) = e.target().and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok()) {
                                        el.style().set_property("background", "transparent").ok();
                                    }
                                }
                            >
                                <span style={format!("width: 3px; border-radius: 2px; flex-shrink: 0; background: {accent};")} />
                                <div style="flex: 1; min-width: 0; font-family: 'Inter', system-ui, sans-serif;">
                                    <div style="display: flex; justify-content: space-between; gap: 8px;">
                                        <span style="font-size: 0.82rem; font-weight: 600; color: #e2e0d8;">{item.parcel_id}</span>
                                        <span style="font-size: 0.7rem; color: #9a9590; font-family: 'JetBrains Mono', monospace;">{item.area}</span>
                                    </div>
                                    <div style="font-size: 0.72rem; color: #9a9590; white-space: nowrap; overflow: hidden; text-overflow: ellipsis;">
                                        {item.owner.unwrap_or_else(|| "Unknown owner".to_string())}
                                    </div>
                                </div>
                            </div>
                        }
                    })
                    .collect_view()
                    .into_any()
            }}
        </div>
    }
}
