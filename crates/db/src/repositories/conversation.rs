use jardin_core::domain::conversation::{ChatSession, ConversationTurn, SessionId};

use super::rows;
use super::RepositoryError;
use crate::DbPool;

/// Conversation log between the owner and the assistant. The engine never
/// reads this to make decisions; it exists so a session can be replayed.
pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_sessions (id, title, client_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.id.0.to_string())
        .bind(&session.title)
        .bind(session.client_id.map(|client_id| client_id.0.to_string()))
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn latest_session(&self) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_sessions ORDER BY created_at DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(rows::session_from_row).transpose()
    }

    pub async fn append_turn(&self, turn: &ConversationTurn) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversation_turns (id, session_id, role, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(turn.id.0.to_string())
        .bind(turn.session_id.0.to_string())
        .bind(rows::turn_role_to_str(turn.role))
        .bind(&turn.content)
        .bind(turn.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE id = ?")
            .bind(turn.created_at.to_rfc3339())
            .bind(turn.session_id.0.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn recent_turns(
        &self,
        session_id: SessionId,
        limit: u32,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let mut turns: Vec<ConversationTurn> = sqlx::query(
            "SELECT * FROM conversation_turns WHERE session_id = ?
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(session_id.0.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(rows::conversation_turn_from_row)
        .collect::<Result<_, _>>()?;
        turns.reverse();
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use jardin_core::domain::conversation::{ChatSession, ConversationTurn, TurnRole};

    use super::SqlConversationRepository;
    use crate::connect_with_settings;
    use crate::migrations::run_pending;

    async fn repository() -> SqlConversationRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        SqlConversationRepository::new(pool)
    }

    fn turn_at(session: &ChatSession, content: &str, offset_secs: i64) -> ConversationTurn {
        let mut turn = ConversationTurn::new(session.id, TurnRole::Assistant, content);
        turn.created_at = session.created_at + Duration::seconds(offset_secs);
        turn
    }

    #[tokio::test]
    async fn recent_turns_come_back_oldest_first_and_honor_the_limit() {
        let repository = repository().await;
        let session = ChatSession::create(None);
        repository.create_session(&session).await.expect("create session");

        for (content, offset) in [("primero", 1), ("segundo", 2), ("tercero", 3)] {
            repository
                .append_turn(&turn_at(&session, content, offset))
                .await
                .expect("append turn");
        }

        let all = repository.recent_turns(session.id, 10).await.expect("all turns");
        let contents: Vec<&str> = all.iter().map(|turn| turn.content.as_str()).collect();
        assert_eq!(contents, vec!["primero", "segundo", "tercero"]);

        let last_two = repository.recent_turns(session.id, 2).await.expect("last two");
        let contents: Vec<&str> = last_two.iter().map(|turn| turn.content.as_str()).collect();
        assert_eq!(contents, vec!["segundo", "tercero"]);
    }

    #[tokio::test]
    async fn appending_a_turn_bumps_the_session_timestamp() {
        let repository = repository().await;
        let session = ChatSession::create(Some("Lunes"));
        repository.create_session(&session).await.expect("create session");

        let turn = turn_at(&session, "anotado", 60);
        repository.append_turn(&turn).await.expect("append turn");

        let latest = repository
            .latest_session()
            .await
            .expect("latest session")
            .expect("session exists");
        assert_eq!(latest.id, session.id);
        assert_eq!(latest.updated_at, turn.created_at);
    }

    #[tokio::test]
    async fn latest_session_is_the_newest_by_creation() {
        let repository = repository().await;
        let mut older = ChatSession::create(Some("Lunes"));
        older.created_at -= Duration::hours(1);
        older.updated_at = older.created_at;
        let newer = ChatSession::create(Some("Martes"));

        repository.create_session(&older).await.expect("create older");
        repository.create_session(&newer).await.expect("create newer");

        let latest = repository
            .latest_session()
            .await
            .expect("latest session")
            .expect("session exists");
        assert_eq!(latest.id, newer.id);
    }
}
