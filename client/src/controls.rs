use leptos::prelude::*;
use wasm_bindgen::JsCast;

use landview_shared::{KNOWN_REGIONS, SearchField, SearchQuery};

use crate::app::{MapRequest, MapRequests, Measure, ParcelStore, request_map};
use crate::colors::hex_with_alpha;
use crate::measure::MeasureMode;

const SECTION_TITLE_STYLE: &str = "font-family: 'Inter', system-ui, sans-serif; font-size: 0.66rem; color: #5a5860; text-transform: uppercase; letter-spacing: 0.12em; margin-bottom: 8px;";
const BUTTON_STYLE: &str = "background: #1a1d2a; color: #e2e0d8; border: 1px solid #282c3e; border-radius: 4px; padding: 6px 10px; cursor: pointer; font-family: 'Inter', system-ui, sans-serif; font-size: 0.78rem;";

fn input_value(e: &leptos::ev::Event) -> Option<String> {
    let target = e.target()?;
    if let Ok(input) = target.clone().dyn_into::<web_sys::HtmlInputElement>() {
        return Some(input.value());
    }
    target
        .dyn_into::<web_sys::HtmlSelectElement>()
        .ok()
        .map(|select| select.value())
}

/// Field selector and value box; Enter or the button runs the search.
#[component]
pub fn SearchBar() -> impl IntoView {
    let store: ParcelStore = expect_context();
    let field = RwSignal::new(SearchField::OwnerName);
    let text = RwSignal::new(String::new());

    let submit = move || {
        // Empty input is ignored rather than clearing an active search.
        if let Ok(query) = SearchQuery::new(field.get_untracked(), &text.get_untracked()) {
            store.search(query);
        }
    };

    let on_field = move |e: leptos::ev::Event| {
        if let Some(parsed) = input_value(&e).as_deref().and_then(SearchField::parse) {
            field.set(parsed);
        }
    };
    let on_input = move |e: leptos::ev::Event| {
        if let Some(value) = input_value(&e) {
            text.set(value);
        }
    };
    let on_keydown = move |e: web_sys::KeyboardEvent| {
        if e.key() == "Enter" {
            e.prevent_default();
            submit();
        }
    };
    let on_clear = move |_| {
        text.set(String::new());
        store.clear_search();
    };

    let searching = move || store.search.with(Option::is_some);

    view! {
        <div style="padding: 12px 24px; border-bottom: 1px solid #282c3e; display: flex; flex-direction: column; gap: 8px;">
            <select
                style="width: 100%; padding: 8px 10px; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 6px; color: #e2e0d8; font-family: 'Inter', system-ui, sans-serif; font-size: 0.82rem;"
                on:change=on_field
            >
                {SearchField::ALL
                    .into_iter()
                    .map(|f| view! {
                        <option value=f.as_str() selected=move || field.get() == f>{f.label()}</option>
                    })
                    .collect_view()}
            </select>
            <div style="position: relative;">
                <input
                    data-search-input=""
                    class="focus-ring"
                    style="width: 100%; padding: 10px 14px; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 6px; color: #e2e0d8; font-family: 'Inter', system-ui, sans-serif; font-size: 0.9rem; outline: none;"
                    type="text"
                    placeholder=move || format!("Search by {}...", field.get().label().to_lowercase())
                    prop:value=move || text.get()
                    on:input=on_input
                    on:keydown=on_keydown
                />
                <div style="position: absolute; right: 10px; top: 50%; transform: translateY(-50%); font-family: 'JetBrains Mono', monospace; font-size: 0.62rem; color: #3a3f5c; background: #13161f; padding: 1px 5px; border-radius: 3px; border: 1px solid #282c3e; pointer-events: none;">"/"</div>
            </div>
            <div style="display: flex; gap: 8px;">
                <button
                    style="flex: 1; background: #3b82f6; color: #fff; border: none; border-radius: 4px; padding: 7px 10px; cursor: pointer; font-family: 'Inter', system-ui, sans-serif; font-size: 0.8rem; font-weight: 600;"
                    on:click=move |_| submit()
                >"Search"</button>
                <button
                    style=BUTTON_STYLE
                    style:display=move || if searching() { "block" } else { "none" }
                    on:click=on_clear
                >"Clear"</button>
            </div>
        </div>
    }
}

/// Region checkboxes with a focus button per region.
#[component]
pub fn RegionFilter() -> impl IntoView {
    let store: ParcelStore = expect_context();
    let MapRequests(map_requests) = expect_context();

    view! {
        <div style="padding: 12px 24px; border-bottom: 1px solid #282c3e;">
            <div style=SECTION_TITLE_STYLE>"Regions"</div>
            {KNOWN_REGIONS
                .into_iter()
                .map(|region| {
                    let name = region.name;
                    let focus = region.focus;
                    let enabled = move || store.regions.with(|r| r.is_enabled(name));
                    view! {
                        <div style="display: flex; align-items: center; justify-content: space-between; padding: 5px 0;">
                            <label style="display: flex; align-items: center; gap: 8px; cursor: pointer; font-family: 'Inter', system-ui, sans-serif; font-size: 0.86rem; color: #e2e0d8;">
                                <input
                                    type="checkbox"
                                    prop:checked=enabled
                                    on:change=move |_| store.toggle_region(name)
                                />
                                <span style=format!(
                                    "display: inline-block; width: 10px; height: 10px; border-radius: 2px; background: {}; border: 1px solid {};",
                                    hex_with_alpha(region.color_hex(), 0.4),
                                    region.color_hex(),
                                ) />
                                {name}
                            </label>
                            <button
                                title=format!("Zoom to {name}")
                                style="background: none; border: 1px solid #282c3e; border-radius: 4px; color: #9a9590; padding: 2px 8px; cursor: pointer; font-size: 0.7rem;"
                                on:click=move |_| request_map(map_requests, MapRequest::Focus(focus))
                            >"Focus"</button>
                        </div>
                    }
                })
                .collect_view()}
        </div>
    }
}

/// Distance and area measurement on the map.
#[component]
pub fn MeasureTools() -> impl IntoView {
    let Measure(measure) = expect_context();

    let mode_button = move |mode: MeasureMode| {
        let active = move || measure.with(|m| m.mode() == mode);
        view! {
            <button
                style=BUTTON_STYLE
                style:background=move || if active() { "#3b82f6" } else { "#1a1d2a" }
                style:border-color=move || if active() { "#3b82f6" } else { "#282c3e" }
                on:click=move |_| {
                    measure.update(|m| {
                        // Pressing the active mode again turns measuring off.
                        let next = if m.mode() == mode { MeasureMode::Off } else { mode };
                        m.set_mode(next);
                    })
                }
            >{mode.label()}</button>
        }
    };

    view! {
        <div style="padding: 12px 24px; border-bottom: 1px solid #282c3e;">
            <div style=SECTION_TITLE_STYLE>"Measure"</div>
            <div style="display: flex; gap: 8px;">
                {mode_button(MeasureMode::Distance)}
                {mode_button(MeasureMode::Area)}
            </div>
            <div
                style="margin-top: 8px; display: flex; align-items: center; justify-content: space-between; gap: 8px;"
                style:display=move || if measure.with(|m| m.is_active()) { "flex" } else { "none" }
            >
                <span style="font-family: 'JetBrains Mono', monospace; font-size: 0.82rem; color: #e2e0d8;">
                    {move || {
                        measure.with(|m| {
                            m.result().unwrap_or_else(|| "Click the map to add points".to_string())
                        })
                    }}
                </span>
                <div style="display: flex; gap: 6px;">
                    <button
                        style=BUTTON_STYLE
                        on:click=move |_| measure.update(|m| {
                            m.undo();
                        })
                    >"Undo"</button>
                    <button style=BUTTON_STYLE on:click=move |_| measure.update(|m| m.clear())>
                        "Clear"
                    </button>
                </div>
            </div>
        </div>
    }
}
