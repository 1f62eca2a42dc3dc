use crate::config::{PetConfig, Size};
use crate::error::PetResult;
use crate::host::{OrientationSource, TextureId, TextureLoader};
use crate::stage::Stage;
use crate::visual::{BabyVisual, IdleVisual, StageVisual};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// Builds stage visuals from host textures and the shared tilt source.
pub struct VisualFactory {
    textures: Box<dyn TextureLoader>,
    orientation: Rc<dyn OrientationSource>,
    config: PetConfig,
}

impl VisualFactory {
    pub fn new(
        textures: Box<dyn TextureLoader>,
        orientation: Rc<dyn OrientationSource>,
        config: PetConfig,
    ) -> Self {
        Self {
            textures,
            orientation,
            config,
        }
    }

    pub fn load_texture(&mut self, name: &str) -> PetResult<TextureId> {
        self.textures.load_texture(name)
    }

    /// Frames that failed to load are skipped; the visual then draws what is left.
    fn frames(&mut self, stage: Stage) -> Vec<TextureId> {
        let mut frames = Vec::new();
        for name in stage.texture_names() {
            match self.textures.load_texture(name) {
                Ok(id) => frames.push(id),
                Err(err) => warn!(%stage, %err, "missing stage texture"),
            }
        }
        frames
    }

    pub fn build(&mut self, stage: Stage) -> Box<dyn StageVisual> {
        let frames = self.frames(stage);
        debug!(%stage, frames = frames.len(), "building stage visual");
        match stage {
            Stage::Baby => Box::new(BabyVisual::new(
                frames,
                Rc::clone(&self.orientation),
                &self.config,
            )),
            _ => Box::new(IdleVisual::for_stage(stage, frames, &self.config)),
        }
    }
}

/// One visual per stage, built on first use and kept for the life of the pet.
pub struct VisualCache {
    factory: VisualFactory,
    visuals: BTreeMap<Stage, Box<dyn StageVisual>>,
    bounds: Size,
    built: usize,
}

impl VisualCache {
    pub fn new(factory: VisualFactory) -> Self {
        Self {
            factory,
            visuals: BTreeMap::new(),
            bounds: Size::default(),
            built: 0,
        }
    }

    pub fn get(&mut self, stage: Stage) -> &mut dyn StageVisual {
        let visual = match self.visuals.entry(stage) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                let mut visual = self.factory.build(stage);
                if !self.bounds.is_empty() {
                    visual.set_bounds(self.bounds);
                }
                self.built += 1;
                slot.insert(visual)
            }
        };
        &mut **visual
    }

    /// Lookup by texture-style stage name; unknown names are an error, never a default.
    pub fn get_named(&mut self, name: &str) -> PetResult<&mut dyn StageVisual> {
        let stage: Stage = name.parse()?;
        Ok(self.get(stage))
    }

    pub fn peek(&self, stage: Stage) -> Option<&dyn StageVisual> {
        self.visuals.get(&stage).map(|v| &**v)
    }

    /// Applies to every cached visual and to any built later.
    pub fn set_bounds(&mut self, bounds: Size) {
        self.bounds = bounds;
        for visual in self.visuals.values_mut() {
            visual.set_bounds(bounds);
        }
    }

    pub fn bounds(&self) -> Size {
        self.bounds
    }

    pub fn load_texture(&mut self, name: &str) -> PetResult<TextureId> {
        self.factory.load_texture(name)
    }

    /// How many visuals have been constructed so far.
    pub fn built(&self) -> usize {
        self.built
    }

    pub fn cached_stages(&self) -> Vec<Stage> {
        self.visuals.keys().copied().collect()
    }
}
