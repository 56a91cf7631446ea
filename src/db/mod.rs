//! Database connectivity


use std::borrow::Borrow;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, trace};

use crate::error::{Error, Result};


pub mod schema;


/// Connection pool type used throughout the service
pub type ConnectionPool = Pool<ConnectionManager<SqliteConnection>>;


/// Pooled connection type used throughout the service
pub type PooledConnection = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;


const MIGRATIONS: EmbeddedMigrations = embed_migrations!();


/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT_MS: u32 = 5000;


/// Applies per-connection SQLite settings as connections are opened
#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {

    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute(&format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS))
            .map_err(r2d2::Error::QueryError)
    }
}


/// Connects to and initializes the camera database
///
/// `url` is a SQLite path (or `:memory:`). An in-memory database only lives
/// as long as its connection, so in that case the pool keeps its
/// connections open indefinitely and callers should use a `pool_size` of 1.
pub fn connect(url: &str, pool_size: u32) -> Result<ConnectionPool> {

    if pool_size == 0 {
        return Err(Error::Config(String::from("pool size must be at least 1")));
    }

    debug!("connecting to database at {}", url);
    let mut builder = Pool::builder()
        .max_size(pool_size)
        .connection_customizer(Box::new(ConnectionOptions))
        .connection_timeout(Duration::from_secs(30));

    if url == ":memory:" {
        builder = builder
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = builder.build(ConnectionManager::new(url))?;

    trace!("running migrations if necessary");
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(Error::Migration)?;

    Ok(pool)
}


/// Provides access to the application database
pub trait DatabaseContext {

    /// Gets a pooled database connection
    ///
    /// The connection returns to the pool when dropped.
    fn conn(&self) -> Result<PooledConnection>;
}

impl<T> DatabaseContext for T
where T: Borrow<ConnectionPool>
{
    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.borrow().get()?)
    }
}
