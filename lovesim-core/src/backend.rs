//! The engine's view of the scenario server.

use async_trait::async_trait;
use lovesim_api::{
    Client, Error, RankingEntry, RankingFilter, RankingReceipt, RankingSubmission,
    ScenarioSummary, Scene, SceneId,
};

/// Source of scenes and leaderboard data.
#[async_trait]
pub trait ScenarioBackend: Send + Sync {
    /// `Ok(None)` when the scene does not exist.
    async fn get_scene(&self, scenario_id: &str, scene_id: SceneId)
        -> Result<Option<Scene>, Error>;

    async fn get_scenarios(&self) -> Result<Vec<ScenarioSummary>, Error>;

    async fn get_rankings(&self, filter: Option<&RankingFilter>)
        -> Result<Vec<RankingEntry>, Error>;

    async fn submit_ranking(&self, submission: &RankingSubmission)
        -> Result<RankingReceipt, Error>;
}

#[async_trait]
impl ScenarioBackend for Client {
    async fn get_scene(
        &self,
        scenario_id: &str,
        scene_id: SceneId,
    ) -> Result<Option<Scene>, Error> {
        Client::get_scene(self, scenario_id, scene_id).await
    }

    async fn get_scenarios(&self) -> Result<Vec<ScenarioSummary>, Error> {
        Client::get_scenarios(self).await
    }

    async fn get_rankings(
        &self,
        filter: Option<&RankingFilter>,
    ) -> Result<Vec<RankingEntry>, Error> {
        Client::get_rankings(self, filter).await
    }

    async fn submit_ranking(
        &self,
        submission: &RankingSubmission,
    ) -> Result<RankingReceipt, Error> {
        Client::submit_ranking(self, submission).await
    }
}
