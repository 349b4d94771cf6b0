//! Pointer hooks that turn picking results into road edits

use anyhow::Result;

use super::render::{PointerCoord, RenderBackend};
use super::types::{CellCoord, RoadClass};
use super::world::{EditOutcome, SimWorld};

/// Hover and paint state of the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct PointerInput {
    pub hovered: Option<CellCoord>,
    pub selected_class: RoadClass,
}

impl Default for PointerInput {
    fn default() -> Self {
        Self {
            hovered: None,
            selected_class: RoadClass::Local,
        }
    }
}

impl PointerInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_class(&mut self, class: RoadClass) {
        self.selected_class = class;
    }

    /// Track the cell under the pointer
    pub fn on_pointer_move<R: RenderBackend>(
        &mut self,
        world: &SimWorld<R>,
        pointer: PointerCoord,
    ) -> Option<CellCoord> {
        self.hovered = world.pick_cell(pointer);
        self.hovered
    }

    /// Toggle the hovered cell with the selected class
    pub fn on_pointer_down<R: RenderBackend>(
        &mut self,
        world: &mut SimWorld<R>,
        pointer: PointerCoord,
    ) -> Result<Option<EditOutcome>> {
        let Some(cell) = self.on_pointer_move(world, pointer) else {
            return Ok(None);
        };
        world.add_road(cell, self.selected_class).map(Some)
    }
}
