//! Pointer and keyboard interaction over the page surface.
//!
//! The engine turns screen-space input into feature store mutations:
//! toggling selections, drawing rectangular regions, dragging vertices of
//! drawn regions with snapping, and panning or zooming the camera.

use crate::camera::Camera;
use crate::config::LabelingConfig;
use crate::feature::{Feature, FeatureCategory, FeatureId};
use crate::feature_store::{FeatureStore, Layer};
use crate::input::{InputState, Key, KeyEvent, MouseButton, PointerEvent};
use crate::label::LabelValueCandidate;
use crate::modify::{GeometryChange, VertexModify};
use crate::schema::FieldType;
use crate::selection::{SelectionSet, menu_position};
use crate::snap::{snap_to_vertices, vertex_targets};
use crate::tools::DrawManager;
use kurbo::{Point, Rect, Size};

/// Distance under which a pointer position counts as the snapped vertex itself.
const VERTEX_EPSILON: f64 = 1e-6;

/// Drag rectangle of a group selection, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRect {
    pub start: Point,
    pub current: Point,
}

impl SelectionRect {
    pub fn to_rect(&self) -> Rect {
        Rect::from_points(self.start, self.current)
    }
}

/// Interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    GroupSelecting(SelectionRect),
    Drawing,
    ModifyingVertex,
    /// The pointer rests on an editable vertex.
    Snapped,
    Panning,
}

/// What the selection looks like after a gesture finished.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSummary {
    pub candidates: Vec<LabelValueCandidate>,
    pub enabled_types: Vec<FieldType>,
    /// Screen position of the inline label menu; `None` when nothing is selected.
    pub menu: Option<Point>,
}

/// Notifications produced while handling input.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// A region was drawn, added to the drawn-region layer and selected.
    RegionDrawn { id: FeatureId },
    /// Labeled regions changed shape; their label values need updating.
    GeometryChanged(Vec<GeometryChange>),
    SelectionFinished(SelectionSummary),
}

/// Input state machine for one page surface.
#[derive(Debug)]
pub struct InteractionEngine {
    state: InteractionState,
    camera: Camera,
    input: InputState,
    config: LabelingConfig,
    viewport: Size,
    page: u32,
    draw_region_mode: bool,
    selection: SelectionSet,
    draw: DrawManager,
    modify: Option<VertexModify>,
    snapped_vertex: Option<Point>,
    /// A feature was hit by the current pointer gesture.
    hit_on_down: bool,
    /// Moving with the button down adds text features to the selection.
    swiping: bool,
}

impl InteractionEngine {
    pub fn new(config: LabelingConfig) -> Self {
        Self {
            state: InteractionState::Idle,
            camera: Camera::with_zoom_limits(config.min_zoom, config.max_zoom),
            input: InputState::new(),
            draw: DrawManager::new(config.min_region_size),
            config,
            viewport: Size::ZERO,
            page: 1,
            draw_region_mode: false,
            selection: SelectionSet::new(),
            modify: None,
            snapped_vertex: None,
            hit_on_down: false,
            swiping: false,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn config(&self) -> &LabelingConfig {
        &self.config
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn draw_region_mode(&self) -> bool {
        self.draw_region_mode
    }

    /// Rectangle of the region being drawn, if any.
    pub fn draw_preview(&self) -> Option<crate::geometry::Polygon> {
        self.draw.preview()
    }

    fn set_state(&mut self, state: InteractionState) {
        if self.state != state {
            log::debug!("Interaction {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Switch to a page image of `page_size` pixels shown at `rotation_degrees`.
    ///
    /// Drops any gesture in progress and the current selection.
    pub fn set_page(
        &mut self,
        store: &mut FeatureStore,
        page: u32,
        page_size: Size,
        rotation_degrees: f64,
    ) {
        self.abort_gesture(store);
        self.selection.clear(store);
        store.set_page_size(page_size);
        self.page = page;
        self.camera.set_page(page_size, rotation_degrees, self.viewport);
    }

    /// Resize the viewport and refit the page.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.camera.fit_to_viewport(viewport, 0.0);
    }

    pub fn set_draw_region_mode(&mut self, store: &mut FeatureStore, enabled: bool) {
        if self.draw_region_mode == enabled {
            return;
        }
        self.draw_region_mode = enabled;
        if !enabled {
            self.abort_gesture(store);
        }
        log::debug!("Draw region mode {}", if enabled { "on" } else { "off" });
    }

    pub fn toggle_draw_region_mode(&mut self, store: &mut FeatureStore) {
        self.set_draw_region_mode(store, !self.draw_region_mode);
    }

    fn abort_gesture(&mut self, store: &mut FeatureStore) {
        self.draw.cancel();
        if let Some(modify) = self.modify.take() {
            modify.cancel(store);
        }
        self.snapped_vertex = None;
        self.hit_on_down = false;
        self.swiping = false;
        self.set_state(InteractionState::Idle);
    }

    pub fn clear_selection(&mut self, store: &mut FeatureStore) {
        self.selection.clear(store);
    }

    /// Remove an uncommitted drawn region. Returns the remaining candidates
    /// when the region was part of the selection.
    pub fn delete_drawn_region(
        &mut self,
        store: &mut FeatureStore,
        id: FeatureId,
    ) -> Option<Vec<LabelValueCandidate>> {
        let was_selected = self.selection.contains(Layer::DrawnRegion, id);
        self.selection.remove(store, Layer::DrawnRegion, id);
        store.remove(Layer::DrawnRegion, id)?;
        was_selected.then(|| self.selection.candidates(store))
    }

    /// Handle a pointer event in screen coordinates.
    pub fn handle_pointer(
        &mut self,
        store: &mut FeatureStore,
        event: &PointerEvent,
    ) -> Vec<InteractionEvent> {
        self.input.handle_pointer_event(event);
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => {
                self.pointer_down(store, *position);
                Vec::new()
            }
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => self.pointer_up(store, *position),
            PointerEvent::Move { position } => {
                self.pointer_move(store, *position);
                Vec::new()
            }
            PointerEvent::Scroll { position, delta } => {
                if delta.y < 0.0 {
                    self.camera.zoom_at(*position, self.config.zoom_step);
                } else if delta.y > 0.0 {
                    self.camera.zoom_at(*position, 1.0 / self.config.zoom_step);
                }
                Vec::new()
            }
            PointerEvent::Leave => {
                self.pointer_leave();
                Vec::new()
            }
            PointerEvent::Down { .. } | PointerEvent::Up { .. } => Vec::new(),
        }
    }

    /// Handle a keyboard event.
    pub fn handle_key(&mut self, store: &mut FeatureStore, event: &KeyEvent) {
        self.input.handle_key_event(event);
        if *event != KeyEvent::Pressed(Key::Escape) {
            return;
        }
        match self.state {
            InteractionState::Drawing => {
                self.draw.cancel();
                self.set_state(InteractionState::Idle);
            }
            InteractionState::ModifyingVertex => {
                if let Some(modify) = self.modify.take() {
                    modify.cancel(store);
                }
                self.snapped_vertex = None;
                self.set_state(InteractionState::Idle);
            }
            _ => {}
        }
    }

    fn snap_tolerance(&self) -> f64 {
        self.camera.screen_to_world_distance(self.config.snap_tolerance_px)
    }

    fn pointer_down(&mut self, store: &mut FeatureStore, position: Point) {
        let world = self.camera.screen_to_world(position);
        self.hit_on_down = false;

        if self.state == InteractionState::Snapped {
            let grabbed = self.snapped_vertex.unwrap_or(world);
            match VertexModify::begin(store, grabbed, VERTEX_EPSILON) {
                Some(modify) => {
                    self.modify = Some(modify);
                    self.set_state(InteractionState::ModifyingVertex);
                }
                None => {
                    self.snapped_vertex = None;
                    self.set_state(InteractionState::Idle);
                }
            }
            return;
        }

        if self.draw_region_mode {
            if self.camera.is_on_page(world) {
                self.draw.begin(world);
                self.set_state(InteractionState::Drawing);
            } else {
                self.set_state(InteractionState::Panning);
            }
            return;
        }

        if self.input.shift {
            self.set_state(InteractionState::GroupSelecting(SelectionRect {
                start: world,
                current: world,
            }));
            return;
        }

        let mut hit_layer = None;
        for layer in Layer::HIT_PRIORITY {
            if !store.is_visible(layer) {
                continue;
            }
            let hits = store.features_at_point(layer, world);
            if hits.is_empty() {
                continue;
            }
            for id in hits {
                self.selection.toggle(store, layer, id);
            }
            hit_layer = Some(layer);
            break;
        }

        self.hit_on_down = hit_layer.is_some();
        match hit_layer {
            Some(layer) if layer != Layer::Pod => {
                self.swiping = true;
                self.set_state(InteractionState::Idle);
            }
            _ => self.set_state(InteractionState::Panning),
        }
    }

    fn pointer_move(&mut self, store: &mut FeatureStore, position: Point) {
        let world = self.camera.screen_to_world(position);
        match self.state {
            InteractionState::Drawing => self.draw.update(world),
            InteractionState::ModifyingVertex => {
                let tolerance = self.snap_tolerance();
                if let Some(modify) = &self.modify {
                    modify.update(store, world, tolerance);
                }
            }
            InteractionState::GroupSelecting(rect) => {
                self.set_state(InteractionState::GroupSelecting(SelectionRect {
                    current: world,
                    ..rect
                }));
            }
            InteractionState::Panning => {
                if self.input.primary_down {
                    self.camera.pan(self.input.pointer_delta());
                }
            }
            InteractionState::Idle | InteractionState::Snapped => {
                if self.swiping && self.input.primary_down {
                    self.swipe(store, world);
                } else if self.draw_region_mode {
                    self.update_snap(store, world);
                }
            }
        }
    }

    fn swipe(&mut self, store: &mut FeatureStore, world: Point) {
        if !store.is_visible(Layer::Text) {
            return;
        }
        for id in store.features_at_point(Layer::Text, world) {
            self.selection.add(store, Layer::Text, id);
            self.hit_on_down = true;
        }
    }

    fn update_snap(&mut self, store: &FeatureStore, world: Point) {
        let snap = snap_to_vertices(world, &vertex_targets(store), self.snap_tolerance());
        if snap.is_snapped() && self.camera.is_on_page(world) {
            self.snapped_vertex = Some(snap.point);
            self.set_state(InteractionState::Snapped);
        } else if self.state == InteractionState::Snapped {
            self.snapped_vertex = None;
            self.set_state(InteractionState::Idle);
        }
    }

    fn pointer_up(&mut self, store: &mut FeatureStore, position: Point) -> Vec<InteractionEvent> {
        let world = self.camera.screen_to_world(position);
        let mut events = Vec::new();

        match self.state {
            InteractionState::Drawing => {
                let polygon = self.draw.end(world);
                self.set_state(InteractionState::Idle);
                if let Some(polygon) = polygon {
                    let feature = Feature::from_pixels(
                        FeatureCategory::DrawnRegion,
                        polygon,
                        store.page_size(),
                        self.page,
                    );
                    let id = feature.id;
                    store.add(Layer::DrawnRegion, feature);
                    self.selection.add(store, Layer::DrawnRegion, id);
                    log::debug!("Region {} drawn on page {}", id, self.page);
                    events.push(InteractionEvent::RegionDrawn { id });
                    events.push(self.finish_selection(store));
                }
            }
            InteractionState::ModifyingVertex => {
                self.snapped_vertex = None;
                self.set_state(InteractionState::Idle);
                let Some(modify) = self.modify.take() else {
                    log::debug!("Pointer up without an active vertex modification");
                    return events;
                };
                let outcome = modify.end(store);
                for (layer, old, new) in outcome.rekeyed {
                    self.selection.rekey(layer, old, new);
                }
                if !outcome.changes.is_empty() {
                    events.push(InteractionEvent::GeometryChanged(outcome.changes));
                }
            }
            InteractionState::GroupSelecting(rect) => {
                let rect = SelectionRect {
                    current: world,
                    ..rect
                }
                .to_rect();
                for layer in Layer::HIT_PRIORITY {
                    if layer == Layer::Pod || !store.is_visible(layer) {
                        continue;
                    }
                    for id in store.features_in_rect(layer, rect) {
                        self.selection.toggle(store, layer, id);
                    }
                }
                self.set_state(InteractionState::Idle);
                events.push(self.finish_selection(store));
            }
            InteractionState::Idle | InteractionState::Snapped | InteractionState::Panning => {
                self.swiping = false;
                if self.state == InteractionState::Panning {
                    self.set_state(InteractionState::Idle);
                }
                if self.hit_on_down {
                    events.push(self.finish_selection(store));
                }
            }
        }
        self.hit_on_down = false;
        events
    }

    fn pointer_leave(&mut self) {
        match self.state {
            InteractionState::Drawing => {
                self.draw.cancel();
                self.set_state(InteractionState::Idle);
            }
            InteractionState::Snapped => {
                self.snapped_vertex = None;
                self.set_state(InteractionState::Idle);
            }
            _ => {}
        }
    }

    fn finish_selection(&self, store: &FeatureStore) -> InteractionEvent {
        let menu = (!self.selection.is_empty()).then(|| {
            menu_position(self.input.pointer_position, self.viewport, &self.config.menu)
        });
        InteractionEvent::SelectionFinished(SelectionSummary {
            candidates: self.selection.candidates(store),
            enabled_types: self.selection.enabled_field_types(store),
            menu,
        })
    }
}
