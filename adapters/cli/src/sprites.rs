//! Sprite manifest loading and the asset checks that settle the latch.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use tribe_war_core::{Biome, Facing};
use tribe_war_rendering::{FeatureKind, SpriteKey};
use tribe_war_sync::UserAction;

const SUPPORTED_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct Manifest {
    version: u32,
    #[serde(default)]
    sprites: BTreeMap<String, String>,
}

/// Reads the manifest at `path`, resolving sprite paths against its directory.
pub(crate) fn load_manifest(path: &Path) -> Result<Vec<(SpriteKey, PathBuf)>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read sprite manifest at {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_manifest(&contents, base)
}

fn parse_manifest(contents: &str, base_path: &Path) -> Result<Vec<(SpriteKey, PathBuf)>> {
    let manifest: Manifest =
        toml::from_str(contents).context("failed to parse sprite manifest toml contents")?;
    if manifest.version != SUPPORTED_MANIFEST_VERSION {
        bail!(
            "unsupported sprite manifest version {}; expected {}",
            manifest.version,
            SUPPORTED_MANIFEST_VERSION
        );
    }

    let mut resolved = BTreeMap::new();
    for (name, relative_path) in manifest.sprites {
        let Some(key) = parse_sprite_key(&name) else {
            bail!("unknown sprite key `{name}` in manifest");
        };
        let _ = resolved.insert(key, base_path.join(relative_path));
    }
    Ok(resolved.into_iter().collect())
}

const fn biome_name(biome: Biome) -> &'static str {
    match biome {
        Biome::Grass => "grass",
        Biome::Snow => "snow",
        Biome::Desert => "desert",
        Biome::Cemetery => "cemetery",
    }
}

const fn feature_name(feature: FeatureKind) -> &'static str {
    match feature {
        FeatureKind::Trees => "trees",
        FeatureKind::Rocks => "rocks",
        FeatureKind::Hills => "hills",
    }
}

/// Manifest key naming a sprite, e.g. `snow_trees` or `desert_entity_left`.
pub(crate) fn sprite_name(key: SpriteKey) -> String {
    match key {
        SpriteKey::Terrain(biome) => format!("{}_terrain", biome_name(biome)),
        SpriteKey::Feature(feature, biome) => {
            format!("{}_{}", biome_name(biome), feature_name(feature))
        }
        SpriteKey::Border => "border".to_owned(),
        SpriteKey::Entity(biome, Facing::Left) => format!("{}_entity_left", biome_name(biome)),
        SpriteKey::Entity(biome, Facing::Right) => format!("{}_entity_right", biome_name(biome)),
        SpriteKey::Unknown => "unknown".to_owned(),
    }
}

fn parse_sprite_key(name: &str) -> Option<SpriteKey> {
    let mut keys = vec![SpriteKey::Border];
    for biome in Biome::ALL {
        keys.push(SpriteKey::Terrain(biome));
        keys.extend(
            FeatureKind::ALL
                .into_iter()
                .map(|feature| SpriteKey::Feature(feature, biome)),
        );
        keys.push(SpriteKey::Entity(biome, Facing::Left));
        keys.push(SpriteKey::Entity(biome, Facing::Right));
    }
    keys.into_iter().find(|key| sprite_name(*key) == name)
}

/// Checks every sprite file and reports each one to the session as settled.
///
/// Unreadable sprites settle as failed; the renderer keeps their fallback
/// colors.
pub(crate) async fn settle_sprites(
    sprites: Vec<(SpriteKey, PathBuf)>,
    actions: UnboundedSender<UserAction>,
) {
    for (key, path) in sprites {
        let loaded = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(sprite = %sprite_name(key), bytes = bytes.len(), "sprite loaded");
                true
            }
            Err(error) => {
                warn!(sprite = %sprite_name(key), path = %path.display(), %error, "sprite unavailable");
                false
            }
        };
        if actions.send(UserAction::AssetSettled { loaded }).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_resolves_paths_relative_to_base_directory() {
        let manifest = r#"
            version = 1

            [sprites]
            snow_entity_left = "northsouth/norscaentity2.png"
            grass_terrain = "vertical/grass.png"
            cemetery_hills = "northsouth/sylvaniamountain.png"
        "#;

        let parsed = parse_manifest(manifest, Path::new("assets")).expect("manifest should parse");

        assert_eq!(
            parsed,
            vec![
                (
                    SpriteKey::Terrain(Biome::Grass),
                    PathBuf::from("assets/vertical/grass.png")
                ),
                (
                    SpriteKey::Feature(FeatureKind::Hills, Biome::Cemetery),
                    PathBuf::from("assets/northsouth/sylvaniamountain.png")
                ),
                (
                    SpriteKey::Entity(Biome::Snow, Facing::Left),
                    PathBuf::from("assets/northsouth/norscaentity2.png")
                ),
            ]
        );
    }

    #[test]
    fn manifest_rejects_unknown_keys_and_versions() {
        let unknown = "version = 1\n[sprites]\nlava_terrain = \"lava.png\"\n";
        assert!(parse_manifest(unknown, Path::new(".")).is_err());

        let future = "version = 2\n[sprites]\ngrass_terrain = \"grass.png\"\n";
        assert!(parse_manifest(future, Path::new(".")).is_err());
    }

    #[test]
    fn sprite_names_round_trip() {
        for biome in Biome::ALL {
            for key in [
                SpriteKey::Terrain(biome),
                SpriteKey::Feature(FeatureKind::Rocks, biome),
                SpriteKey::Entity(biome, Facing::Right),
            ] {
                assert_eq!(parse_sprite_key(&sprite_name(key)), Some(key));
            }
        }
        assert_eq!(parse_sprite_key("unknown"), None);
    }

    #[tokio::test]
    async fn missing_sprites_settle_as_failed() {
        let (actions, mut settled) = tokio::sync::mpsc::unbounded_channel();
        let sprites = vec![(
            SpriteKey::Border,
            PathBuf::from("definitely/not/here/border.png"),
        )];

        settle_sprites(sprites, actions).await;

        assert_eq!(
            settled.recv().await,
            Some(UserAction::AssetSettled { loaded: false })
        );
        assert_eq!(settled.recv().await, None);
    }
}
