//! Scene transition rules.

use crate::config::GameRules;
use crate::state::Favorability;
use lovesim_api::{Choice, SceneId};

/// Scene that follows `choice`, given favorability after its delta was applied.
///
/// Low favorability forces the game-over scene regardless of the choice. The
/// decisive-moment sentinel resolves to the perfect or bad ending.
pub fn next_scene_id(rules: &GameRules, favorability: Favorability, choice: &Choice) -> SceneId {
    let score = favorability.value();
    let scenes = &rules.scenes;

    if score < rules.thresholds.game_over {
        return scenes.game_over;
    }

    if choice.next_scene_id == scenes.decisive_moment {
        return if score >= rules.thresholds.perfect_ending {
            scenes.perfect_ending
        } else {
            scenes.bad_ending
        };
    }

    choice.next_scene_id
}
