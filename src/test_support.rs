//! Test doubles shared across modules.

use std::cell::RefCell;
use std::rc::Rc;

use crate::scene::{PipelineFactory, SceneBundle, SceneId};

pub type EventLog = Rc<RefCell<Vec<String>>>;

/// Stand-in for a GPU object that logs its construction and drop.
pub struct Tracked {
    pub id: usize,
    pub scene: Option<SceneId>,
    pub pattern: Option<usize>,
    pub size: (u32, u32),
    log: EventLog,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.log.borrow_mut().push(format!("drop {}", self.id));
    }
}

/// Pipeline factory that builds [`Tracked`] placeholders.
pub struct RecordingFactory {
    pub log: EventLog,
    next_id: usize,
    viewport: (u32, u32),
}

impl RecordingFactory {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            log: Rc::default(),
            next_id: 0,
            viewport: (width, height),
        }
    }

    fn track(&mut self, scene: Option<SceneId>, pattern: Option<usize>) -> Tracked {
        self.next_id += 1;
        self.log.borrow_mut().push(format!("build {}", self.next_id));
        Tracked {
            id: self.next_id,
            scene,
            pattern,
            size: self.viewport,
            log: Rc::clone(&self.log),
        }
    }

    pub fn dropped(&self, id: usize) -> bool {
        self.log.borrow().iter().any(|e| *e == format!("drop {id}"))
    }

    pub fn builds(&self) -> usize {
        self.log.borrow().iter().filter(|e| e.starts_with("build")).count()
    }
}

impl PipelineFactory for RecordingFactory {
    type Pipeline = Tracked;
    type Compositor = Tracked;

    fn build_pipeline(&mut self, scene: &SceneBundle) -> Tracked {
        self.track(Some(scene.id()), None)
    }

    fn build_compositor(&mut self, pattern: usize) -> Tracked {
        self.track(None, Some(pattern))
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn resize_pipeline(&mut self, pipeline: &mut Tracked, width: u32, height: u32) {
        pipeline.size = (width, height);
    }
}
