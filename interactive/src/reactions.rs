use std::sync::Arc;

use leptos::prelude::*;
use memeshare_shared::{EntityRef, PostId, ReactionSummary};
use memeshare_sync::{Outcome, ReactionEngine, SettleCallback};
use wasm_bindgen_futures::spawn_local;

use crate::services::Services;

/// Re-renders reaction controls after their engine changed state.
pub fn bump(tick: RwSignal<u64>) {
    let _ = tick.try_update(|t| *t += 1);
}

/// Reaction toggle with count.
///
/// Renders whatever `engine` holds; `tick` must outlive the control so a
/// request started from a disposed control still repaints its successor.
#[component]
pub fn ReactionButton(engine: Arc<ReactionEngine>, tick: RwSignal<u64>) -> impl IntoView {
    let engine = StoredValue::new(engine);
    let summary = move || {
        tick.track();
        engine.with_value(|e| e.summary())
    };
    let syncing = move || {
        tick.track();
        engine.with_value(|e| e.is_syncing())
    };

    let run = move |react_only: bool| {
        let engine = engine.get_value();
        spawn_local(async move {
            // The engine applies its optimistic value before the request
            // suspends, so the second branch paints it.
            let (outcome, _) = futures::join!(
                async {
                    if react_only {
                        engine.react().await
                    } else {
                        engine.toggle().await
                    }
                },
                async { bump(tick) }
            );
            if let Outcome::Skipped(skip) = &outcome {
                tracing::debug!(entity = %engine.entity(), ?skip, "Reaction click ignored");
            }
            bump(tick);
        });
    };

    view! {
        <div class="memeshare-reaction">
            <button
                class="memeshare-reaction-btn"
                class:active=move || summary().has_reacted
                disabled=syncing
                on:click=move |_| run(false)
            >
                "\u{1F602}"
            </button>
            <span class="memeshare-reaction-count">{move || summary().count}</span>
            <Show when=move || !summary().has_reacted>
                <span class="memeshare-reaction-picker">
                    <button
                        class="memeshare-btn memeshare-btn-sm"
                        disabled=syncing
                        on:click=move |_| run(true)
                    >
                        "Laugh"
                    </button>
                </span>
            </Show>
        </div>
    }
}

/// Standalone post-level reactions: paints the cached value, then hydrates.
#[component]
pub fn PostReactions(post_id: PostId) -> impl IntoView {
    let services = expect_context::<Services>();
    let tick = RwSignal::new(0u64);

    let on_settle: SettleCallback =
        Arc::new(move |_: EntityRef, _: &ReactionSummary| bump(tick));
    let engine = Arc::new(
        services
            .reaction_engine(EntityRef::post(post_id))
            .on_settle(on_settle),
    );

    let detach = engine.clone();
    on_cleanup(move || detach.detach());

    let hydrating = engine.clone();
    spawn_local(async move {
        let _ = futures::join!(hydrating.hydrate(), async { bump(tick) });
        bump(tick);
    });

    view! {
        <div class="memeshare-post-reactions">
            <ReactionButton engine=engine tick=tick />
        </div>
    }
}
