use std::rc::Rc;

use crate::domain::markup::{self, DocumentModel};
use crate::model::body::RUNTIME_CLASS;
use crate::model::Models;
use crate::scheduler::TaskQueue;
use crate::stage::Stage;

/// Derives one clean, persistable markup string from the live surface.
///
/// The synchronous and incremental variants run the same ordered step table
/// and produce byte-identical output; the incremental one just yields the
/// thread between steps. Nothing here ever mutates the live document except
/// the style store syncing its own carrier tag, and no partial output ever
/// escapes.
pub struct Serializer {
    ctx: Rc<SerializeCtx>,
}

struct SerializeCtx {
    stage: Rc<Stage>,
    models: Rc<Models>,
    queue: Rc<TaskQueue>,
    indent: usize,
}

/// Accumulator threaded through the steps: the captured styles, the
/// detached working copy and the evolving output string.
#[derive(Default)]
struct SerializeJob {
    styles: String,
    clone: Option<DocumentModel>,
    html: String,
}

type Step = fn(&SerializeCtx, &mut SerializeJob);

/// The snapshot steps, in order. Every serialization runs each of them
/// exactly once, whichever variant schedules them.
const STEPS: &[(&str, Step)] = &[
    ("capture-styles", step_capture_styles),
    ("clone-document", step_clone_document),
    ("drop-page-and-temp-tags", step_drop_page_and_temp_tags),
    ("strip-editable-classes", step_strip_editable_classes),
    ("strip-internal-classes", step_strip_internal_classes),
    ("repair-inline-artifacts", step_repair_inline_artifacts),
    ("clear-viewport-sizing", step_clear_viewport_sizing),
    ("restore-runtime-class", step_restore_runtime_class),
    ("stringify", step_stringify),
    ("unprepare-markup", step_unprepare_markup),
    ("restore-user-head", step_restore_user_head),
    ("beautify", step_beautify),
];

impl Serializer {
    pub fn new(stage: Rc<Stage>, models: Rc<Models>, queue: Rc<TaskQueue>, indent: usize) -> Self {
        Self {
            ctx: Rc::new(SerializeCtx {
                stage,
                models,
                queue,
                indent,
            }),
        }
    }

    /// Snapshot the surface in one go. An empty surface yields an empty
    /// string.
    pub fn serialize(&self) -> String {
        let mut job = SerializeJob::default();
        for (_, step) in STEPS {
            step(&self.ctx, &mut job);
        }
        job.html
    }

    /// Snapshot the surface one step per queue turn, keeping the
    /// interaction thread responsive. The result is delivered through the
    /// queue as well, so call sites see the same timing whatever the last
    /// step cost.
    pub fn serialize_async(&self, on_done: impl FnOnce(String) + 'static) {
        advance(
            Rc::clone(&self.ctx),
            SerializeJob::default(),
            0,
            Box::new(on_done),
        );
    }
}

fn advance(ctx: Rc<SerializeCtx>, mut job: SerializeJob, index: usize, on_done: Box<dyn FnOnce(String)>) {
    if index == STEPS.len() {
        ctx.queue.defer(move || on_done(job.html));
        return;
    }
    (STEPS[index].1)(&ctx, &mut job);
    let queue = Rc::clone(&ctx.queue);
    queue.defer(move || advance(ctx, job, index + 1, on_done));
}

fn step_capture_styles(ctx: &SerializeCtx, job: &mut SerializeJob) {
    let mut doc = ctx.stage.document_mut();
    if let Some(doc) = doc.as_mut() {
        job.styles = ctx.models.property.get_all_styles();
        ctx.models.property.save_properties(doc);
    }
}

fn step_clone_document(ctx: &SerializeCtx, job: &mut SerializeJob) {
    if let Some(doc) = ctx.stage.document().as_ref() {
        let mut clone = doc.clone();
        ctx.models.property.write_styles(&mut clone, &job.styles);
        job.clone = Some(clone);
    }
}

fn step_drop_page_and_temp_tags(ctx: &SerializeCtx, job: &mut SerializeJob) {
    let Some(clone) = job.clone.as_mut() else {
        return;
    };
    ctx.models.head.remove_page_style_tag(clone);
    ctx.models.head.remove_temp_tags(clone);
}

fn step_strip_editable_classes(ctx: &SerializeCtx, job: &mut SerializeJob) {
    let Some(clone) = job.clone.as_mut() else {
        return;
    };
    ctx.models.body.remove_editable_classes(clone);
}

fn step_strip_internal_classes(ctx: &SerializeCtx, job: &mut SerializeJob) {
    let Some(clone) = job.clone.as_mut() else {
        return;
    };
    ctx.models.body.remove_internal_classes(clone);
}

fn step_repair_inline_artifacts(_ctx: &SerializeCtx, job: &mut SerializeJob) {
    let Some(clone) = job.clone.as_mut() else {
        return;
    };
    let repaired = markup::repair_inline_artifacts(clone.body());
    clone.set_body(repaired);
}

fn step_clear_viewport_sizing(_ctx: &SerializeCtx, job: &mut SerializeJob) {
    let Some(clone) = job.clone.as_mut() else {
        return;
    };
    clone.clear_body_style("min-width");
    clone.clear_body_style("min-height");
}

fn step_restore_runtime_class(_ctx: &SerializeCtx, job: &mut SerializeJob) {
    let Some(clone) = job.clone.as_mut() else {
        return;
    };
    clone.add_body_class(RUNTIME_CLASS);
}

fn step_stringify(_ctx: &SerializeCtx, job: &mut SerializeJob) {
    let Some(clone) = job.clone.as_ref() else {
        return;
    };
    job.html = format!("<!DOCTYPE html><html>{}</html>", clone.document_markup());
}

fn step_unprepare_markup(ctx: &SerializeCtx, job: &mut SerializeJob) {
    if job.clone.is_none() {
        return;
    }
    job.html = ctx.models.element.unprepare_for_edit(&job.html);
}

fn step_restore_user_head(ctx: &SerializeCtx, job: &mut SerializeJob) {
    if job.clone.is_none() {
        return;
    }
    job.html = ctx.models.head.insert_user_head(&job.html);
}

fn step_beautify(ctx: &SerializeCtx, job: &mut SerializeJob) {
    if job.clone.is_none() {
        return;
    }
    job.html = beautify_html(&job.html, ctx.indent);
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Break markup at tag boundaries and re-indent the block structure. Text
/// that shares a line with its tag stays there.
pub fn beautify_html(html: &str, indent: usize) -> String {
    let html = html.trim();
    if html.is_empty() {
        return String::new();
    }
    let split = html.replace("><", ">\n<");
    let mut depth: usize = 0;
    let mut out = String::with_capacity(split.len());
    for line in split.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("</") {
            depth = depth.saturating_sub(1);
        }
        out.push_str(&" ".repeat(depth * indent));
        out.push_str(line);
        out.push('\n');
        if opens_block(line) {
            depth += 1;
        }
    }
    out
}

fn opens_block(line: &str) -> bool {
    if !line.starts_with('<') || line.starts_with("</") || line.starts_with("<!") {
        return false;
    }
    if line.ends_with("/>") {
        return false;
    }
    let name: String = line[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    if VOID_TAGS.contains(&name.as_str()) {
        return false;
    }
    // A line like `<p>text</p>` opens and closes in place.
    !line.contains("</")
}
