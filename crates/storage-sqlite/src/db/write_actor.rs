//! Single-writer actor: every SQLite write funnels through one thread.

use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use log::error;
use tokio::sync::{mpsc, oneshot};

use shopsync_core::errors::DatabaseError;
use shopsync_core::{Error, Result};

type WriteJob = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Cloneable handle that submits write closures to the writer thread.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<WriteJob>,
}

impl WriteHandle {
    /// Runs `operation` on the writer connection, wrapped in an immediate
    /// transaction, and hands back its result.
    pub async fn exec<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: WriteJob = Box::new(move |conn| {
            let outcome = run_in_transaction(conn, operation);
            let _ = tx.send(outcome);
        });
        self.tx.send(job).map_err(|_| writer_gone())?;
        rx.await.map_err(|_| writer_gone())?
    }
}

/// Spawns the writer thread and returns the handle repositories write through.
pub fn spawn_writer(pool: Pool<ConnectionManager<SqliteConnection>>) -> WriteHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<WriteJob>();
    std::thread::spawn(move || {
        while let Some(job) = rx.blocking_recv() {
            match pool.get() {
                Ok(mut conn) => job(&mut conn),
                // Dropping the job resolves the caller with a writer-gone error.
                Err(err) => error!("[WriteActor] Could not obtain a connection: {}", err),
            }
        }
    });
    WriteHandle { tx }
}

fn writer_gone() -> Error {
    Error::Database(DatabaseError::Internal(
        "Write actor is no longer running".to_string(),
    ))
}

enum TxError {
    Db(diesel::result::Error),
    App(Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Db(err)
    }
}

/// Writes run under BEGIN IMMEDIATE; the write lock is held for the whole
/// closure.
fn run_in_transaction<T, F>(conn: &mut SqliteConnection, operation: F) -> Result<T>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T>,
{
    conn.immediate_transaction::<_, TxError, _>(|conn| operation(conn).map_err(TxError::App))
        .map_err(|err| match err {
            TxError::Db(db) => Error::Database(DatabaseError::QueryFailed(db.to_string())),
            TxError::App(app) => app,
        })
}
