use std::future::Future;
use std::sync::Arc;

use leptos::prelude::*;
use memeshare_shared::{CommentId, EntityRef, ImageUpload, PostId, ReactionSummary};
use memeshare_sync::{
    CommentNode, Outcome, ReactionEngine, ReactionRegistry, SettleCallback, ThreadConfig,
    ThreadSnapshot, ThreadStore,
};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::js_sys::Uint8Array;
use web_sys::HtmlInputElement;

use crate::api::js_error;
use crate::reactions::{bump, ReactionButton};
use crate::services::Services;

/// Store handle plus the last snapshot rendered from it, shared as context.
#[derive(Clone, Copy)]
pub struct Thread {
    store: StoredValue<Arc<ThreadStore>>,
    snapshot: RwSignal<ThreadSnapshot>,
    /// Comment reaction engines, kept across re-renders of the list.
    reactions: StoredValue<Arc<ReactionRegistry>>,
    reaction_tick: RwSignal<u64>,
}

impl Thread {
    fn store(&self) -> Arc<ThreadStore> {
        self.store.get_value()
    }

    /// Engine for the reaction control of comment `id`, seeded from the
    /// summary embedded in the page the first time it is rendered.
    fn reaction_engine(
        &self,
        services: &Services,
        id: CommentId,
        seed: ReactionSummary,
    ) -> Arc<ReactionEngine> {
        let entity = EntityRef::comment(id);
        let thread = *self;
        self.reactions.get_value().get_or_insert_with(entity, || {
            let on_settle: SettleCallback =
                Arc::new(move |entity: EntityRef, settled: &ReactionSummary| {
                    if let Some(store) = thread.store.try_get_value() {
                        let _ = store.set_reaction_summary(entity.id, settled.clone());
                    }
                    bump(thread.reaction_tick);
                });
            services
                .reaction_engine(entity)
                .seeded(seed)
                .on_settle(on_settle)
        })
    }

    fn refresh(&self) {
        self.snapshot.set(self.store().snapshot());
    }

    /// Runs a synchronous store command and re-renders.
    fn apply(&self, op: impl FnOnce(&ThreadStore) -> Outcome) -> Outcome {
        let outcome = op(&self.store());
        self.refresh();
        outcome
    }

    /// Awaits an asynchronous store command, re-rendering around it.
    async fn run<F, Fut>(self, op: F) -> Outcome
    where
        F: FnOnce(Arc<ThreadStore>) -> Fut,
        Fut: Future<Output = Outcome>,
    {
        self.snapshot.update(|s| s.is_loading = true);
        let outcome = op(self.store()).await;
        self.refresh();
        outcome
    }

    fn spawn<F, Fut>(self, op: F)
    where
        F: FnOnce(Arc<ThreadStore>) -> Fut + 'static,
        Fut: Future<Output = Outcome> + 'static,
    {
        spawn_local(async move {
            let _ = self.run(op).await;
        });
    }
}

/// Reads the first selected file of an `<input type="file">`.
async fn read_upload(input: &HtmlInputElement) -> Result<Option<ImageUpload>, String> {
    let Some(file) = input.files().and_then(|files| files.get(0)) else {
        return Ok(None);
    };
    let buffer = JsFuture::from(file.array_buffer()).await.map_err(js_error)?;
    Ok(Some(ImageUpload {
        file_name: file.name(),
        content_type: file.type_(),
        data: Uint8Array::new(&buffer).to_vec(),
    }))
}

/// Comment section for one post.
#[component]
pub fn CommentSection(post_id: PostId, config: ThreadConfig) -> impl IntoView {
    let services = expect_context::<Services>();
    let store = Arc::new(ThreadStore::new(post_id, services.comments.clone(), config));
    let reactions = Arc::new(ReactionRegistry::new());
    let thread = Thread {
        snapshot: RwSignal::new(store.snapshot()),
        store: StoredValue::new(store),
        reactions: StoredValue::new(reactions.clone()),
        reaction_tick: RwSignal::new(0),
    };
    provide_context(thread);
    on_cleanup(move || reactions.detach_all());

    // Fetch comments on mount
    thread.spawn(|store| async move { store.load_first_page().await });

    let snapshot = thread.snapshot;
    view! {
        <section class="memeshare-comments">
            <h3>{move || format!("Comments ({})", snapshot.with(|s| s.total_with_replies))}</h3>
            <CommentForm parent=None />
            <Show when=move || snapshot.with(|s| s.is_loading && s.comments.is_empty())>
                <p class="memeshare-loading">"Loading comments..."</p>
            </Show>
            <div class="memeshare-comment-list">
                {move || {
                    snapshot
                        .get()
                        .comments
                        .into_iter()
                        .map(|node| view! { <CommentItem node=node /> })
                        .collect_view()
                }}
            </div>
            <Show when=move || snapshot.with(|s| s.has_more)>
                <button
                    class="memeshare-btn"
                    disabled=move || snapshot.with(|s| s.is_loading)
                    on:click=move |_| thread.spawn(|store| async move { store.load_more_top_level().await })
                >
                    "Load more comments"
                </button>
            </Show>
            <DeletePrompt />
        </section>
    }
}

/// Form for posting a comment, or a reply when `parent` is set.
#[component]
fn CommentForm(parent: Option<CommentId>) -> impl IntoView {
    let thread = expect_context::<Thread>();
    let body = RwSignal::new(String::new());
    let image: RwSignal<Option<ImageUpload>> = RwSignal::new(None);
    let submitting = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let retryable = RwSignal::new(false);

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let text = body.get_untracked();
        let upload = image.get_untracked();
        submitting.set(true);
        spawn_local(async move {
            let outcome = thread
                .run(move |store| async move {
                    match parent {
                        Some(parent) => store.add_reply(parent, &text, upload).await,
                        None => store.add_comment(&text, upload).await,
                    }
                })
                .await;
            match outcome {
                Outcome::Done => {
                    body.set(String::new());
                    image.set(None);
                    error.set(None);
                    retryable.set(false);
                }
                Outcome::Failed(e) => {
                    // Draft is kept either way; offer a retry only when it can help.
                    retryable.set(e.is_retryable());
                    error.set(Some(e.to_string()));
                }
                Outcome::Skipped(_) => {}
            }
            submitting.set(false);
        });
    };

    let on_pick = move |ev: leptos::ev::Event| {
        let input: HtmlInputElement = event_target(&ev);
        spawn_local(async move {
            match read_upload(&input).await {
                Ok(upload) => image.set(upload),
                Err(e) => error.set(Some(e)),
            }
        });
    };

    let placeholder = if parent.is_some() {
        "Write a reply..."
    } else {
        "Write a comment..."
    };

    view! {
        <form class="memeshare-comment-form" on:submit=on_submit>
            <textarea
                class="memeshare-textarea"
                placeholder=placeholder
                prop:value=move || body.get()
                on:input=move |ev| {
                    body.set(event_target_value(&ev));
                }
            />
            <input type="file" accept="image/*" on:change=on_pick />
            <button
                class="memeshare-btn"
                type="submit"
                disabled=move || {
                    submitting.get() || (body.with(|b| b.trim().is_empty()) && image.with(Option::is_none))
                }
            >
                {move || if submitting.get() { "Posting..." } else { "Post" }}
            </button>
            <Show when=move || error.with(Option::is_some)>
                <p class="memeshare-error">
                    {move || error.get().unwrap_or_default()}
                    <Show when=move || retryable.get()>
                        <button
                            class="memeshare-btn memeshare-btn-sm"
                            type="submit"
                            disabled=move || submitting.get()
                        >
                            "Retry"
                        </button>
                    </Show>
                </p>
            </Show>
        </form>
    }
}

/// Single comment with its reply window.
#[component]
fn CommentItem(node: CommentNode) -> impl IntoView {
    let thread = expect_context::<Thread>();
    let services = expect_context::<Services>();
    let comment = node.comment;
    let id = comment.id;
    let is_reply = !comment.is_top_level();
    let editing = move || thread.snapshot.with(|s| s.edit.as_ref().map(|e| e.target) == Some(id));

    let body = {
        let text = comment.text.clone();
        let image = comment.image.clone();
        move || {
            if editing() {
                view! { <EditForm /> }.into_any()
            } else {
                view! {
                    <p class="memeshare-comment-body">{text.clone()}</p>
                    {image.clone().map(|src| view! { <img class="memeshare-comment-image" src=src alt="" /> })}
                }
                .into_any()
            }
        }
    };

    let replies = node
        .replies
        .into_iter()
        .map(|reply| view! { <CommentItem node=reply /> }.into_any())
        .collect_view();

    view! {
        <div class="memeshare-comment">
            <div class="memeshare-comment-header">
                <img src=comment.user.avatar_url.clone() alt="" class="memeshare-avatar" width="24" height="24" />
                <strong>{comment.user.username.clone()}</strong>
                <time>{comment.created_at.clone()}</time>
                <button
                    class="memeshare-btn memeshare-btn-sm"
                    on:click=move |_| {
                        let _ = thread.apply(|store| store.begin_edit(id));
                    }
                >
                    "Edit"
                </button>
                <button
                    class="memeshare-btn memeshare-btn-sm memeshare-btn-danger"
                    on:click=move |_| {
                        let _ = thread.apply(|store| store.request_delete(id));
                    }
                >
                    "Delete"
                </button>
            </div>
            {body}
            <ReactionButton
                engine=thread.reaction_engine(&services, id, comment.reaction.clone())
                tick=thread.reaction_tick
            />
            <Show when=move || !is_reply>
                <div class="memeshare-replies">
                    <ReplyPager parent=id />
                    <CommentForm parent=Some(id) />
                </div>
            </Show>
            {replies}
        </div>
    }
}

/// Back / forward controls of one reply window.
#[component]
fn ReplyPager(parent: CommentId) -> impl IntoView {
    let thread = expect_context::<Thread>();
    let page = move || thread.snapshot.with(|s| s.reply_page(parent));

    view! {
        <div class="memeshare-pager">
            <Show when=move || page().is_some_and(|p| !p.is_first())>
                <button
                    class="memeshare-btn memeshare-btn-sm"
                    on:click=move |_| thread.spawn(move |store| async move { store.load_back_replies(parent).await })
                >
                    "Previous replies"
                </button>
            </Show>
            <Show when=move || page().map_or(true, |p| p.has_more())>
                <button
                    class="memeshare-btn memeshare-btn-sm"
                    on:click=move |_| thread.spawn(move |store| async move { store.load_more_replies(parent).await })
                >
                    {move || if page().is_some() { "More replies" } else { "Show replies" }}
                </button>
            </Show>
        </div>
    }
}

/// Inline editor for the comment currently staged for edit.
#[component]
fn EditForm() -> impl IntoView {
    let thread = expect_context::<Thread>();
    let (draft, had_image) = thread.snapshot.with_untracked(|s| {
        s.edit
            .as_ref()
            .map(|e| (e.draft_text.clone(), e.had_image()))
            .unwrap_or_default()
    });
    // Local until submit so typing does not re-render the thread.
    let text = RwSignal::new(draft);
    let remove_image = RwSignal::new(false);
    let replacement: RwSignal<Option<ImageUpload>> = RwSignal::new(None);
    let saving = RwSignal::new(false);

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let store = thread.store();
        let _ = store.update_edit_draft(&text.get_untracked());
        if let Some(upload) = replacement.get_untracked() {
            let _ = store.stage_edit_image(Some(upload));
        } else if remove_image.get_untracked() {
            let _ = store.stage_edit_image(None);
        }
        saving.set(true);
        spawn_local(async move {
            let _ = thread.run(|store| async move { store.commit_edit().await }).await;
            saving.set(false);
        });
    };

    let on_pick = move |ev: leptos::ev::Event| {
        let input: HtmlInputElement = event_target(&ev);
        spawn_local(async move {
            if let Ok(upload) = read_upload(&input).await {
                replacement.set(upload);
            }
        });
    };

    view! {
        <form class="memeshare-comment-form" on:submit=on_submit>
            <textarea
                class="memeshare-textarea"
                prop:value=move || text.get()
                on:input=move |ev| text.set(event_target_value(&ev))
            />
            <input type="file" accept="image/*" on:change=on_pick />
            <Show when=move || had_image>
                <label>
                    <input
                        type="checkbox"
                        prop:checked=move || remove_image.get()
                        on:change=move |ev| remove_image.set(event_target_checked(&ev))
                    />
                    "Remove image"
                </label>
            </Show>
            <button class="memeshare-btn" type="submit" disabled=move || saving.get()>
                {move || if saving.get() { "Saving..." } else { "Save" }}
            </button>
            <button
                class="memeshare-btn"
                type="button"
                on:click=move |_| {
                    let _ = thread.apply(|store| store.cancel_edit());
                }
            >
                "Cancel"
            </button>
        </form>
    }
}

/// Confirmation for the comment staged for deletion.
#[component]
fn DeletePrompt() -> impl IntoView {
    let thread = expect_context::<Thread>();

    view! {
        <Show when=move || thread.snapshot.with(|s| s.pending_delete.is_some())>
            <div class="memeshare-confirm">
                <span>"Delete this comment?"</span>
                <button
                    class="memeshare-btn memeshare-btn-danger"
                    on:click=move |_| thread.spawn(|store| async move { store.confirm_delete().await })
                >
                    "Delete"
                </button>
                <button
                    class="memeshare-btn"
                    on:click=move |_| {
                        let _ = thread.apply(|store| store.cancel_delete());
                    }
                >
                    "Cancel"
                </button>
            </div>
        </Show>
    }
}
