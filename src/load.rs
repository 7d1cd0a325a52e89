use std::cell::RefCell;
use std::rc::Rc;

use regex_lite::{Captures, Regex};

use crate::domain::markup;
use crate::error::FileError;
use crate::migration::Migration;
use crate::model::body::{PUBLISHED_CLASS, RUNTIME_CLASS};
use crate::model::head::TEMP_TAG_CLASS;
use crate::model::Models;
use crate::notify::Notifier;
use crate::scheduler::TaskQueue;
use crate::serialize::Serializer;
use crate::session::SessionState;
use crate::settings::FileConfig;
use crate::stage::{Indicator, Stage};
use crate::storage::{DoneCallback, ErrorCallback};

const HELP_LINK: &str = "https://github.com/sitepad/sitepad/wiki/project-files";

/// Caller intent for one install: which indicator covers the surface, and
/// whether the migration collaborator runs.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub indicator: Indicator,
    pub migrate: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            indicator: Indicator::Blocking,
            migrate: true,
        }
    }
}

impl LoadOptions {
    /// Variant for silently replacing content already on display.
    pub fn reload() -> Self {
        Self {
            indicator: Indicator::Light,
            migrate: true,
        }
    }
}

/// Validates, transforms and installs raw markup into the surface.
///
/// One install is a chain of phases, each a precondition for the next:
/// reset, string transforms, signature validation, install, readiness
/// polling, edition resources, migration, model-state restoration. A
/// migration may demand a reload, which re-enters the chain from the top
/// with the re-serialized surface, up to a fixed ceiling.
pub struct LoadPipeline {
    stage: Rc<Stage>,
    models: Rc<Models>,
    serializer: Rc<Serializer>,
    migration: Rc<dyn Migration>,
    notifier: Rc<dyn Notifier>,
    queue: Rc<TaskQueue>,
    session: Rc<SessionState>,
    config: FileConfig,
}

impl LoadPipeline {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        stage: Rc<Stage>,
        models: Rc<Models>,
        serializer: Rc<Serializer>,
        migration: Rc<dyn Migration>,
        notifier: Rc<dyn Notifier>,
        queue: Rc<TaskQueue>,
        session: Rc<SessionState>,
        config: FileConfig,
    ) -> Rc<Self> {
        Rc::new(Self {
            stage,
            models,
            serializer,
            migration,
            notifier,
            queue,
            session,
            config,
        })
    }

    /// Install `raw` into the surface.
    ///
    /// `on_done` fires exactly once, after the surface is ready and
    /// migration has converged. Signature rejections notify the user and
    /// fire neither callback; session state is untouched.
    pub fn install(
        self: Rc<Self>,
        raw: &str,
        options: LoadOptions,
        on_done: impl FnOnce() + 'static,
        on_error: impl FnOnce(FileError) + 'static,
    ) {
        Self::attempt(&self, raw, options, 0, Box::new(on_done), Box::new(on_error));
    }

    fn attempt(
        this: &Rc<Self>,
        raw: &str,
        options: LoadOptions,
        reloads: u32,
        on_done: DoneCallback,
        on_error: ErrorCallback,
    ) {
        this.stage.reset();
        this.models.page.reset();
        this.stage.set_indicator(options.indicator);

        let mut raw = raw.to_string();
        // Relative resources keep resolving against the adopted location
        // while editing. The marker is a temporary tag and never reaches a
        // persisted snapshot.
        if let Some(info) = this.session.file_info() {
            raw = raw.replacen(
                "<head>",
                &format!(
                    "<head><base class=\"{}\" href=\"{}\" target=\"_blank\">",
                    TEMP_TAG_CLASS, info.path
                ),
                1,
            );
        }
        // The author's head tags can be malformed; parsed in place they
        // could corrupt the document structure.
        raw = this.models.head.extract_user_head(&raw);
        raw = this.models.element.prepare_for_edit(&raw);
        // Protocol-relative references keep the editor usable over https.
        raw = raw.replace("http://", "//").replace("https://", "//");

        if !raw.contains(RUNTIME_CLASS) {
            eprintln!("Not a document made with this editor.");
            this.stage.clear_indicator();
            this.notifier.alert(
                "I can not open this document. I can only open projects made with this editor.",
                Some(HELP_LINK),
            );
            return;
        }
        if raw.contains(PUBLISHED_CLASS) {
            eprintln!("This is a published copy.");
            this.stage.clear_indicator();
            this.notifier.alert(
                "I can not open this document. It is a published copy of a project, not the project itself.",
                Some(HELP_LINK),
            );
            return;
        }

        // The runtime marker only applies outside the editor; the snapshot
        // puts it back.
        raw = strip_runtime_class(&raw);

        this.stage.install(&raw);
        Self::await_ready(this, 1, options, reloads, on_done, on_error);
    }

    /// There is no reliable load event for the surface (referenced assets
    /// may be missing), so readiness is polled with backoff until the
    /// configured budget runs out.
    fn await_ready(
        this: &Rc<Self>,
        attempt: u32,
        options: LoadOptions,
        reloads: u32,
        on_done: DoneCallback,
        on_error: ErrorCallback,
    ) {
        if this.stage.is_ready() {
            Self::on_surface_ready(this, options, reloads, on_done, on_error);
            return;
        }
        if attempt >= this.config.max_readiness_checks {
            this.stage.clear_indicator();
            on_error(FileError::SurfaceTimeout { attempts: attempt });
            return;
        }
        let delay = backoff_ticks(attempt, this.config.readiness_backoff_cap);
        let next = Rc::clone(this);
        this.queue.defer_ticks(delay, move || {
            Self::await_ready(&next, attempt + 1, options, reloads, on_done, on_error);
        });
    }

    fn on_surface_ready(
        this: &Rc<Self>,
        options: LoadOptions,
        reloads: u32,
        on_done: DoneCallback,
        on_error: ErrorCallback,
    ) {
        // Either the tag injection or a later phase fails; one continuation.
        let (tag_error, later_error) = split_error(on_error);
        let stage = Rc::clone(&this.stage);
        let tag_error: ErrorCallback = Box::new(move |e| {
            stage.clear_indicator();
            tag_error(e);
        });
        let next = Rc::clone(this);
        let on_tags_loaded: DoneCallback = Box::new(move || {
            Self::run_migration(&next, options, reloads, on_done, later_error);
        });

        let mut doc = this.stage.document_mut();
        let Some(doc) = doc.as_mut() else {
            return;
        };
        this.models.head.add_temp_tags(
            doc,
            &this.config.edition_stylesheets,
            &this.config.editor_base_url,
            on_tags_loaded,
            tag_error,
        );
    }

    fn run_migration(
        this: &Rc<Self>,
        options: LoadOptions,
        reloads: u32,
        on_done: DoneCallback,
        on_error: ErrorCallback,
    ) {
        {
            // The style store must reflect this document before migration or
            // a reload serialization read it.
            let mut doc = this.stage.document_mut();
            if let Some(doc) = doc.as_mut() {
                this.models.property.init_styles(doc);
                this.models.property.load_properties(doc);
            }
        }
        if !options.migrate {
            Self::finish(this, on_done);
            return;
        }
        let next = Rc::clone(this);
        let queue = Rc::clone(&this.queue);
        // The collaborator may answer synchronously; the continuation goes
        // back through the queue so any surface borrow it holds is released
        // first.
        this.migration.process(
            &this.stage,
            &this.models,
            Box::new(move |needs_reload| {
                queue.defer(move || {
                    if needs_reload {
                        Self::reload(&next, options, reloads, on_done, on_error);
                    } else {
                        Self::finish(&next, on_done);
                    }
                });
            }),
        );
    }

    fn reload(
        this: &Rc<Self>,
        options: LoadOptions,
        reloads: u32,
        on_done: DoneCallback,
        on_error: ErrorCallback,
    ) {
        if reloads >= this.config.max_migration_reloads {
            this.stage.clear_indicator();
            on_error(FileError::MigrationDiverged(reloads));
            return;
        }
        eprintln!("Migration requested a reload ({} done so far).", reloads);
        let raw = this.serializer.serialize();
        Self::attempt(this, &raw, options, reloads + 1, on_done, on_error);
    }

    fn finish(this: &Rc<Self>, on_done: DoneCallback) {
        {
            let mut doc_ref = this.stage.document_mut();
            if let Some(doc) = doc_ref.as_mut() {
                this.models.property.init_styles(doc);
                this.models.property.load_properties(doc);
                this.models.body.select_root();
                this.models.body.set_editable(doc, true);
                // Re-assert head style and script so the editor panes pick
                // them up.
                let css = this.models.head.get_head_style(doc);
                this.models.head.set_head_style(doc, &css);
                let js = this.models.head.get_head_script(doc);
                this.models.head.set_head_script(doc, &js);
                let page = this.models.page.get_current(doc);
                this.models.page.set_current(doc, page.as_deref());
                // A template has no publication target of its own.
                if this.session.is_template() {
                    this.models.head.set_publication_path(doc, None);
                }
            }
        }
        this.stage.clear_indicator();
        on_done();
    }
}

fn strip_runtime_class(raw: &str) -> String {
    let re = Regex::new(r"<body[^>]*>").unwrap();
    re.replace(raw, |caps: &Captures| {
        markup::remove_class_everywhere(&caps[0], RUNTIME_CLASS)
    })
    .into_owned()
}

fn backoff_ticks(attempt: u32, cap: u32) -> u32 {
    (1u32 << attempt.min(6).saturating_sub(1)).min(cap.max(1))
}

/// Two handles onto one error continuation; whichever fires first wins and
/// the other becomes a no-op.
fn split_error(on_error: ErrorCallback) -> (ErrorCallback, ErrorCallback) {
    let slot = Rc::new(RefCell::new(Some(on_error)));
    let first = {
        let slot = Rc::clone(&slot);
        Box::new(move |e| {
            if let Some(cb) = slot.borrow_mut().take() {
                cb(e);
            }
        }) as ErrorCallback
    };
    let second = Box::new(move |e| {
        if let Some(cb) = slot.borrow_mut().take() {
            cb(e);
        }
    }) as ErrorCallback;
    (first, second)
}
