use super::AppState;
use crate::error::{PortalError, PortalResult};
use crate::types::*;

/// Check an upload and turn it into a game owned by `team_name`
fn build_submission(team_name: &str, upload: GameUpload) -> PortalResult<Submission> {
    let name = upload.name.trim();
    let description = upload.description.trim();
    let project_id = upload.project_id.trim();

    if name.is_empty() || description.is_empty() || project_id.is_empty() {
        return Err(PortalError::Validation(
            "Name, description and project id are required".to_string(),
        ));
    }
    if !project_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(PortalError::Validation(
            "Project id must be numeric".to_string(),
        ));
    }

    let contributors: Vec<String> = upload
        .contributors
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if contributors.is_empty() {
        return Err(PortalError::Validation(
            "At least one contributor is needed".to_string(),
        ));
    }
    if contributors.len() > MAX_CONTRIBUTORS {
        return Err(PortalError::Validation(format!(
            "Only {} contributors are allowed",
            MAX_CONTRIBUTORS
        )));
    }

    let preview_url = upload
        .preview_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_PREVIEW_URL.to_string());

    Ok(Submission {
        id: ulid::Ulid::new().to_string(),
        display_name: name.to_string(),
        description: description.to_string(),
        owner_team_name: team_name.to_string(),
        preview_url,
        project_url: format!("{}{}", PROJECT_URL_PREFIX, project_id),
        contributors,
        likes: Default::default(),
        comments: Vec::new(),
        created_at: chrono::Utc::now().to_rfc3339(),
    })
}

impl AppState {
    /// Upload a game on behalf of the signed-in team
    pub async fn upload_game(&self, team: &Session, upload: GameUpload) -> PortalResult<Submission> {
        let submission = build_submission(&team.name, upload)?;
        self.store.insert_submission(submission.clone()).await?;

        tracing::info!(
            "{} uploaded game {} ({})",
            team.name,
            submission.display_name,
            submission.id
        );
        Ok(submission)
    }

    /// All games, newest first
    pub async fn list_games(&self) -> PortalResult<Vec<Submission>> {
        let mut games = self.store.list_submissions().await?;
        games.reverse();
        Ok(games)
    }

    pub async fn get_game(&self, game_id: &str) -> PortalResult<Submission> {
        self.store
            .get_submission(game_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("game {}", game_id)))
    }

    /// Like a game. Liking twice counts once. Returns the like count.
    pub async fn like_game(&self, game_id: &str, uid: &str) -> PortalResult<usize> {
        let likes = self.store.add_like(game_id, uid).await?;
        tracing::debug!("Game {} now has {} likes", game_id, likes);
        Ok(likes)
    }

    pub async fn comment_on_game(
        &self,
        game_id: &str,
        author: &Session,
        content: &str,
    ) -> PortalResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PortalError::Validation("Comment is empty".to_string()));
        }

        let comment = Comment {
            author_name: author.name.clone(),
            author_role: author.role,
            content: content.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.store.append_comment(game_id, comment.clone()).await?;
        Ok(comment)
    }
}
