use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::domain::markup::DocumentModel;
use crate::scheduler::TaskQueue;

/// Sizing hint applied to the body while editing, so narrow documents still
/// fill the editing viewport. Cleared again when a snapshot is taken.
pub const VIEWPORT_MIN_WIDTH: u32 = 1200;

/// Loading indicator shown over the surface. Blocking covers the whole
/// stage for a first load; Light is the unobtrusive variant for silent
/// reloads. The two are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indicator {
    #[default]
    None,
    Blocking,
    Light,
}

/// Script execution state of the surface. Initialization happens after the
/// document is written, once referenced assets have settled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionContext {
    pub initialized: bool,
    /// The scripting capability editing depends on.
    pub scripting: bool,
}

/// The single live editable rendering target.
///
/// Exactly one document is active at a time; installing always goes through
/// a full reset first, so nothing from a prior document survives.
pub struct Stage {
    document: RefCell<Option<DocumentModel>>,
    context: Rc<Cell<ExecutionContext>>,
    indicator: Cell<Indicator>,
    generation: Rc<Cell<u64>>,
    readiness_latency: Cell<u32>,
    queue: Rc<TaskQueue>,
}

impl Stage {
    pub fn new(queue: Rc<TaskQueue>) -> Self {
        Self {
            document: RefCell::new(None),
            context: Rc::new(Cell::new(ExecutionContext::default())),
            indicator: Cell::new(Indicator::None),
            generation: Rc::new(Cell::new(0)),
            readiness_latency: Cell::new(1),
            queue,
        }
    }

    /// Queue turns between install and context readiness.
    pub fn set_readiness_latency(&self, ticks: u32) {
        self.readiness_latency.set(ticks);
    }

    /// Clear any residual content. The surface can retain state across
    /// re-parenting, so this writes an empty document and closes it rather
    /// than assuming empty means clean.
    pub fn reset(&self) {
        self.document.replace(Some(DocumentModel::default()));
        self.document.replace(None);
        self.context.set(ExecutionContext::default());
        self.generation.set(self.generation.get() + 1);
    }

    /// Replace the surface content with `raw`. Context readiness arrives on
    /// a later queue turn: scripts and referenced assets finish loading
    /// after the document is written.
    pub fn install(&self, raw: &str) {
        let mut doc = DocumentModel::parse(raw);
        doc.set_body_style("min-width", &format!("{}px", VIEWPORT_MIN_WIDTH));
        self.document.replace(Some(doc));
        self.generation.set(self.generation.get() + 1);

        let context = Rc::clone(&self.context);
        let generation = Rc::clone(&self.generation);
        let expected = generation.get();
        self.queue.defer_ticks(self.readiness_latency.get(), move || {
            // A reset or re-install in the meantime owns the surface now.
            if generation.get() == expected {
                context.set(ExecutionContext {
                    initialized: true,
                    scripting: true,
                });
            }
        });
    }

    pub fn document(&self) -> Ref<'_, Option<DocumentModel>> {
        self.document.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, Option<DocumentModel>> {
        self.document.borrow_mut()
    }

    pub fn context(&self) -> ExecutionContext {
        self.context.get()
    }

    /// True iff a document is installed and its body is non-empty.
    pub fn has_content(&self) -> bool {
        self.document
            .borrow()
            .as_ref()
            .is_some_and(|d| !d.body_is_empty())
    }

    /// True once the document, its execution context and the scripting
    /// capability are all in place.
    pub fn is_ready(&self) -> bool {
        let ctx = self.context.get();
        self.document.borrow().is_some() && ctx.initialized && ctx.scripting
    }

    pub fn set_indicator(&self, indicator: Indicator) {
        self.indicator.set(indicator);
    }

    pub fn clear_indicator(&self) {
        self.indicator.set(Indicator::None);
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> (Rc<TaskQueue>, Stage) {
        let queue = Rc::new(TaskQueue::new());
        let stage = Stage::new(queue.clone());
        (queue, stage)
    }

    #[test]
    fn test_install_becomes_ready_after_queue_turns() {
        let (queue, stage) = stage();
        stage.install("<head></head><body><p>x</p></body>");
        assert!(stage.has_content());
        assert!(!stage.is_ready());
        queue.run_until_idle();
        assert!(stage.is_ready());
    }

    #[test]
    fn test_reset_clears_content_and_readiness() {
        let (queue, stage) = stage();
        stage.install("<head></head><body><p>x</p></body>");
        queue.run_until_idle();
        assert!(stage.is_ready());
        stage.reset();
        assert!(!stage.has_content());
        assert!(!stage.is_ready());
        assert!(stage.document().is_none());
    }

    #[test]
    fn test_stale_readiness_task_does_not_resurrect_reset_surface() {
        let (queue, stage) = stage();
        stage.install("<head></head><body><p>x</p></body>");
        stage.reset();
        queue.run_until_idle();
        assert!(!stage.is_ready());
    }

    #[test]
    fn test_has_content_false_for_empty_body() {
        let (_queue, stage) = stage();
        stage.install("<head><title>t</title></head><body>  </body>");
        assert!(!stage.has_content());
    }

    #[test]
    fn test_install_applies_viewport_sizing_hint() {
        let (_queue, stage) = stage();
        stage.install("<head></head><body><p>x</p></body>");
        let doc = stage.document();
        assert_eq!(
            doc.as_ref().unwrap().body_style("min-width").unwrap(),
            "1200px"
        );
    }

    #[test]
    fn test_indicators_are_exclusive() {
        let (_queue, stage) = stage();
        stage.set_indicator(Indicator::Blocking);
        assert_eq!(stage.indicator(), Indicator::Blocking);
        stage.set_indicator(Indicator::Light);
        assert_eq!(stage.indicator(), Indicator::Light);
        stage.clear_indicator();
        assert_eq!(stage.indicator(), Indicator::None);
    }
}
