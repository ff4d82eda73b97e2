mod api;
mod comments;
mod logging;
mod reactions;
mod repository;
mod services;
mod storage;

use leptos::prelude::*;
use memeshare_shared::PostId;
use memeshare_sync::{ReactionConfig, ThreadConfig};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use web_sys::Element;

use crate::services::Services;

/// Parses a JSON `data-*` attribute, falling back to defaults.
fn data_config<T: DeserializeOwned + Default>(el: &Element, name: &str) -> T {
    let Some(raw) = el.get_attribute(name) else {
        return T::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(attribute = name, error = %e, "Ignoring malformed config");
        T::default()
    })
}

fn post_id(el: &Element) -> Option<PostId> {
    let id = el
        .get_attribute("data-post-id")
        .and_then(|value| value.parse().ok());
    if id.is_none() {
        tracing::error!(element = %el.id(), "Missing or invalid data-post-id");
    }
    id
}

fn main() {
    console_error_panic_hook::set_once();

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };

    let comments_el = document.get_element_by_id("memeshare-comments");
    let reactions_el = document.get_element_by_id("memeshare-reactions");

    let level = comments_el
        .iter()
        .chain(reactions_el.iter())
        .find_map(|el| el.get_attribute("data-log-level"));
    logging::init(logging::parse_level(level.as_deref()));

    // Mount comment section if the mount point exists
    if let Some(el) = comments_el {
        if let Some(post_id) = post_id(&el) {
            let config: ThreadConfig = data_config(&el, "data-config");
            let services = Services::browser(data_config(&el, "data-reaction-config"));
            let html_el: web_sys::HtmlElement = el.unchecked_into();
            leptos::mount::mount_to(html_el, move || {
                provide_context(services.clone());
                view! { <comments::CommentSection post_id=post_id config=config.clone() /> }
            })
            .forget();
        }
    }

    // Mount post-level reactions if the mount point exists
    if let Some(el) = reactions_el {
        if let Some(post_id) = post_id(&el) {
            let reaction_config: ReactionConfig = data_config(&el, "data-reaction-config");
            let services = Services::browser(reaction_config);
            let html_el: web_sys::HtmlElement = el.unchecked_into();
            leptos::mount::mount_to(html_el, move || {
                provide_context(services.clone());
                view! { <reactions::PostReactions post_id=post_id /> }
            })
            .forget();
        }
    }
}
