use sqlx::PgPool;
use tracing::instrument;

/// Creates the tables the review workflow owns or reads. Statements are
/// idempotent so this can run on every startup.
#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::debug!(statement_count = SCHEMA_STATEMENTS.len(), "schema ensured");
    Ok(())
}

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS app_user (
        id UUID PRIMARY KEY,
        login TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        wallet_address TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS event (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS activity (
        id UUID PRIMARY KEY,
        event_id UUID NOT NULL REFERENCES event(id) ON DELETE CASCADE,
        sponsor_name TEXT NOT NULL,
        title TEXT NOT NULL,
        token_reward BIGINT NOT NULL,
        requires_proof BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMP NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS passport (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES app_user(id),
        event_id UUID NOT NULL REFERENCES event(id) ON DELETE CASCADE,
        progress INT NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT NOW(),
        UNIQUE (user_id, event_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS proof (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES app_user(id),
        activity_id UUID NOT NULL REFERENCES activity(id) ON DELETE CASCADE,
        passport_id UUID NOT NULL REFERENCES passport(id) ON DELETE CASCADE,
        kind TEXT NOT NULL,
        text_proof TEXT,
        image_url TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        rejection_reason TEXT,
        validated_by TEXT,
        validated_at TIMESTAMP,
        tokens_awarded BIGINT,
        transaction_hash TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP NOT NULL DEFAULT NOW(),
        UNIQUE (passport_id, activity_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS passport_activity (
        id UUID PRIMARY KEY,
        passport_id UUID NOT NULL REFERENCES passport(id) ON DELETE CASCADE,
        activity_id UUID NOT NULL REFERENCES activity(id) ON DELETE CASCADE,
        status TEXT NOT NULL DEFAULT 'pending',
        requires_proof BOOLEAN NOT NULL,
        proof_id UUID REFERENCES proof(id),
        completed_at TIMESTAMP,
        UNIQUE (passport_id, activity_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_proof_status ON proof (status)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_passport_activity_passport
        ON passport_activity (passport_id)
    "#,
];
