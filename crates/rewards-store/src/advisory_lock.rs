use rewards_core::constants::LEADER_LOCK_KEY;
use rewards_core::error::RewardsError;
use sqlx::{Connection, PgConnection};
use tracing::{info, warn};

/// Session-scoped Postgres advisory lock used for single-leader exclusion
/// across replicas.
///
/// Deliberately holds a single, un-pooled `PgConnection` rather than
/// borrowing from the shared application pool: advisory locks taken with
/// `pg_advisory_lock` (as opposed to the `_xact_` variants) are tied to the
/// *session*, so a pooled connection recycled to another task would silently
/// transfer leadership. Losing this connection is defined to mean losing
/// leadership.
pub struct AdvisoryLock {
    conn: PgConnection,
    held: bool,
}

impl AdvisoryLock {
    /// Open the dedicated lock connection. Does not attempt to acquire the
    /// lock yet — call `try_acquire`.
    pub async fn connect(database_url: &str) -> Result<Self, RewardsError> {
        let conn = PgConnection::connect(database_url).await?;
        Ok(Self { conn, held: false })
    }

    /// Non-blocking attempt to become leader. Returns `true` if this call (or
    /// a previous one on this connection) holds the lock.
    pub async fn try_acquire(&mut self) -> Result<bool, RewardsError> {
        if self.held {
            return Ok(true);
        }
        let (acquired,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
            .bind(LEADER_LOCK_KEY)
            .fetch_one(&mut self.conn)
            .await?;

        if acquired {
            info!("acquired leader advisory lock");
            self.held = true;
        }
        Ok(acquired)
    }

    /// Trivial liveness query run on the leader heartbeat. On
    /// error, the caller must treat leadership as lost — the connection (and
    /// with it the session-scoped lock) may already be gone.
    pub async fn heartbeat(&mut self) -> Result<(), RewardsError> {
        if !self.held {
            return Err(RewardsError::NotLeader);
        }
        sqlx::query("SELECT 1")
            .execute(&mut self.conn)
            .await
            .map_err(|e| {
                warn!(error = %e, "lock connection heartbeat failed — leadership lost");
                self.held = false;
                RewardsError::LockConnectionLost
            })?;
        Ok(())
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Explicitly release the lock on orderly shutdown. A
    /// dropped connection would also release it, but an explicit unlock lets
    /// a follower take over immediately rather than waiting on the server to
    /// notice the TCP connection died.
    pub async fn release(&mut self) -> Result<(), RewardsError> {
        if !self.held {
            return Ok(());
        }
        let (released,): (bool,) = sqlx::query_as("SELECT pg_advisory_unlock($1)")
            .bind(LEADER_LOCK_KEY)
            .fetch_one(&mut self.conn)
            .await?;
        self.held = false;
        if released {
            info!("released leader advisory lock");
        } else {
            warn!("pg_advisory_unlock reported no lock was held");
        }
        Ok(())
    }
}
