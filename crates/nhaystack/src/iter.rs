//! Full-space enumeration for read-all queries.
//!
//! Walks the visible components depth first, then the visible histories.
//! The walk state lives in a [`SpaceCursor`] that can be taken out of the
//! iterator between pages and resumed later against the same station, so
//! a long enumeration never holds the station for its whole length.

use haystack_types::{Dict, Ref};
use nhaystack_station::{Handle, Station};
use tracing::warn;

use crate::context::Context;
use crate::correlate::RemotePointIndex;
use crate::tags;

#[derive(Debug, Clone, Default)]
enum Phase {
    #[default]
    Start,
    Components {
        stack: Vec<Handle>,
    },
    Histories {
        index: usize,
    },
    Done,
}

/// Resumable position of a full-space walk.
#[derive(Debug, Clone, Default)]
pub struct SpaceCursor {
    phase: Phase,
    remote: RemotePointIndex,
}

impl SpaceCursor {
    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    /// Remote point lists fetched by this walk so far.
    pub fn remote_fetches(&self) -> usize {
        self.remote.fetches()
    }
}

/// Lazy `(id, tags)` sequence over the whole visible space.
pub struct SpaceIterator<'a, S: Station + ?Sized> {
    ctx: Context<'a, S>,
    cursor: SpaceCursor,
}

impl<'a, S: Station + ?Sized> SpaceIterator<'a, S> {
    pub fn new(ctx: Context<'a, S>) -> Self {
        Self::resume(ctx, SpaceCursor::default())
    }

    pub fn resume(ctx: Context<'a, S>, cursor: SpaceCursor) -> Self {
        Self { ctx, cursor }
    }

    pub fn cursor(&self) -> &SpaceCursor {
        &self.cursor
    }

    pub fn into_cursor(self) -> SpaceCursor {
        self.cursor
    }

    /// Up to `size` more entities.
    pub fn next_page(&mut self, size: usize) -> Vec<(Ref, Dict)> {
        self.by_ref().take(size).collect()
    }
}

fn visit_component<S: Station + ?Sized>(
    ctx: Context<'_, S>,
    handle: Handle,
    stack: &mut Vec<Handle>,
    remote: &mut RemotePointIndex,
) -> Option<(Ref, Dict)> {
    let Some(comp) = ctx.station.component(handle) else {
        warn!("Skipping component {} removed during enumeration", handle);
        return None;
    };
    stack.extend(comp.children.iter().rev().copied());

    if !tags::is_visible(comp) {
        return None;
    }
    let dict = tags::project_with(ctx, comp, |point| remote.history_for_point(ctx, point));
    Some((ctx.ids.component_ref(handle), dict))
}

impl<S: Station + ?Sized> Iterator for SpaceIterator<'_, S> {
    type Item = (Ref, Dict);

    fn next(&mut self) -> Option<Self::Item> {
        let ctx = self.ctx;
        loop {
            let next_phase = match &mut self.cursor.phase {
                Phase::Start => Phase::Components {
                    stack: vec![ctx.station.root()],
                },
                Phase::Components { stack } => match stack.pop() {
                    Some(handle) => {
                        match visit_component(ctx, handle, stack, &mut self.cursor.remote) {
                            Some(item) => return Some(item),
                            None => continue,
                        }
                    }
                    None => Phase::Histories { index: 0 },
                },
                Phase::Histories { index } => {
                    let histories = ctx.station.histories();
                    match histories.get(*index) {
                        Some(cfg) => {
                            *index += 1;
                            let paired = self.cursor.remote.paired_point(ctx, cfg);
                            if tags::is_visible_history(ctx.config.show_linked_histories, paired) {
                                let dict = tags::project_history(ctx, cfg, paired);
                                return Some((ctx.ids.history_ref(&cfg.id), dict));
                            }
                            continue;
                        }
                        None => Phase::Done,
                    }
                }
                Phase::Done => return None,
            };
            self.cursor.phase = next_phase;
        }
    }
}
