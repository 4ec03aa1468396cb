use std::collections::{BTreeMap, HashMap};

use glam::Vec3;
use hecs::Entity;
use log::{info, warn};

use super::{SceneBundle, SceneGraph, SceneId};
use crate::config::ShowroomConfig;
use crate::environment::{EnvironmentCatalog, MainRoom};
use crate::error::Result;

/// Which stand a scene node belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StandRef {
    /// Index into the owning bundle's `stands`.
    pub index: usize,
    pub destination: SceneId,
}

/// Maps stand root nodes to their stands so a raycast hit on any part of a
/// stand can be traced back to it.
#[derive(Debug, Default)]
pub struct StandTable {
    by_root: HashMap<Entity, StandRef>,
}

impl StandTable {
    pub fn index(bundle: &SceneBundle) -> Self {
        let by_root = bundle
            .stands
            .iter()
            .enumerate()
            .map(|(index, stand)| {
                (
                    stand.root(),
                    StandRef {
                        index,
                        destination: stand.destination(),
                    },
                )
            })
            .collect();
        Self { by_root }
    }

    /// Walks from `entity` toward the root and returns the first stand found.
    pub fn resolve(&self, graph: &SceneGraph, entity: Entity) -> Option<StandRef> {
        graph
            .ancestors(entity)
            .find_map(|e| self.by_root.get(&e).copied())
    }

    pub fn len(&self) -> usize {
        self.by_root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_root.is_empty()
    }
}

/// Owns every scene for the lifetime of the showroom.
///
/// Scene 0 is the main hall with one stand per configured entry. Every stand
/// id `n` also gets a detail scene at index `n`, holding a single stand and
/// the environment the catalog registers for `n`.
pub struct SceneRegistry {
    scenes: BTreeMap<SceneId, SceneBundle>,
    stand_tables: BTreeMap<SceneId, StandTable>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self {
            scenes: BTreeMap::new(),
            stand_tables: BTreeMap::new(),
        }
    }

    pub fn build(config: &ShowroomConfig, catalog: &EnvironmentCatalog) -> Result<Self> {
        config.validate()?;
        let aspect = config.window.width as f32 / config.window.height.max(1) as f32;
        let mut registry = Self::new();

        let mut main = SceneBundle::new(SceneId::MAIN, "main", &config.main_camera, aspect);
        let root = main.graph.root();
        let room = MainRoom::spawn(&mut main.graph, root);
        main.set_environment(Box::new(room));
        for stand in &config.stands {
            main.add_stand(stand.position(), &stand.texture, SceneId(stand.id));
        }
        registry.insert(main);

        for stand in &config.stands {
            let id = SceneId(stand.id);
            let mut bundle =
                SceneBundle::new(id, &format!("stand-{}", stand.id), &config.stand_camera, aspect);
            bundle.add_stand(Vec3::ZERO, &stand.texture, id);
            let root = bundle.graph.root();
            match catalog.build(stand.id, &mut bundle.graph, root) {
                Some(environment) => bundle.set_environment(environment),
                None => warn!("no environment registered for stand {}, {id} stays empty", stand.id),
            }
            registry.insert(bundle);
        }

        info!("built {} scenes", registry.count());
        Ok(registry)
    }

    /// Adds a scene, replacing any scene with the same id.
    pub fn insert(&mut self, bundle: SceneBundle) {
        let id = bundle.id();
        self.stand_tables.insert(id, StandTable::index(&bundle));
        self.scenes.insert(id, bundle);
    }

    pub fn get(&self, id: SceneId) -> Option<&SceneBundle> {
        self.scenes.get(&id)
    }

    pub fn get_mut(&mut self, id: SceneId) -> Option<&mut SceneBundle> {
        self.scenes.get_mut(&id)
    }

    /// Scene bundle together with its stand table.
    pub fn scene_with_stands_mut(&mut self, id: SceneId) -> Option<(&mut SceneBundle, &StandTable)> {
        let bundle = self.scenes.get_mut(&id)?;
        let table = self.stand_tables.get(&id)?;
        Some((bundle, table))
    }

    pub fn stand_table(&self, id: SceneId) -> Option<&StandTable> {
        self.stand_tables.get(&id)
    }

    pub fn contains(&self, id: SceneId) -> bool {
        self.scenes.contains_key(&id)
    }

    pub fn count(&self) -> usize {
        self.scenes.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = SceneId> + '_ {
        self.scenes.keys().copied()
    }

    /// Applies a new viewport aspect ratio to every scene camera.
    pub fn set_aspect(&mut self, aspect: f32) {
        for bundle in self.scenes.values_mut() {
            bundle.set_aspect(aspect);
        }
    }
}

impl Default for SceneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StandConfig;
    use crate::picking::{Ray, raycast_all};

    #[test]
    fn default_config_builds_main_and_three_detail_scenes() {
        let registry =
            SceneRegistry::build(&ShowroomConfig::default(), &EnvironmentCatalog::standard())
                .expect("registry");
        assert_eq!(registry.count(), 4);
        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(ids, vec![SceneId(0), SceneId(1), SceneId(2), SceneId(3)]);

        let main = registry.get(SceneId::MAIN).expect("main");
        let destinations: Vec<_> = main.stands.iter().map(|s| s.destination()).collect();
        assert_eq!(destinations, vec![SceneId(1), SceneId(2), SceneId(3)]);
        for id in 1..=3 {
            let detail = registry.get(SceneId(id)).expect("detail");
            assert_eq!(detail.stands.len(), 1);
            assert!(detail.environment.is_some());
        }
    }

    #[test]
    fn missing_environment_leaves_scene_empty() {
        let mut config = ShowroomConfig::default();
        config.stands.push(StandConfig::new(7, "textures/extra.png", [0.0, 0.0, -4.0]));
        let registry =
            SceneRegistry::build(&config, &EnvironmentCatalog::standard()).expect("registry");
        let extra = registry.get(SceneId(7)).expect("scene 7");
        assert!(extra.environment.is_none());
        assert_eq!(extra.stands.len(), 1);
    }

    #[test]
    fn hits_on_stand_parts_resolve_to_the_stand() {
        let mut registry =
            SceneRegistry::build(&ShowroomConfig::default(), &EnvironmentCatalog::standard())
                .expect("registry");
        let (bundle, table) = registry.scene_with_stands_mut(SceneId::MAIN).expect("main");
        assert_eq!(table.len(), 3);

        // Stand 1 sits at (3, 0, -1); aim straight down at its glass top.
        let ray = Ray::new(Vec3::new(3.0, 10.0, -1.0), Vec3::NEG_Y);
        let hit = raycast_all(&bundle.graph, &ray)
            .into_iter()
            .find_map(|hit| table.resolve(&bundle.graph, hit.entity))
            .expect("stand hit");
        assert_eq!(hit.destination, SceneId(1));
        assert_eq!(hit.index, 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = ShowroomConfig::default();
        config.stands.push(StandConfig::new(1, "dup.png", [0.0; 3]));
        assert!(SceneRegistry::build(&config, &EnvironmentCatalog::standard()).is_err());
    }
}
