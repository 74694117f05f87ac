//! Database wrapper.
//! Uses diesel with SQLite backend,

use crate::error::{Error, Result};
use crate::models::{ComicRecord, LinkRecord, NewPhilosopher, PhilosopherRecord, ProgressRecord};
use crate::page::{Comic, Philosopher};
use crate::schema::{comic_philosophers, comics, philosophers, progress};
use chrono::NaiveDateTime;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

embed_migrations!("migrations");

/// Key of the single row in `progress` table.
const PROGRESS_KEY: i32 = 0;

/// Outcome of an insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Outcome of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Created,
    Existing,
}

impl Presence {
    fn from_affected(rows: usize) -> Self {
        if rows > 0 {
            Self::Created
        } else {
            Self::Existing
        }
    }
}

/// Counters from [`Storage::link_philosophers`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Linked {
    pub philosophers_created: usize,
    pub links_created: usize,
    pub links_removed: usize,
}

/// Database wrapper instance.
pub struct Storage {
    conn: SqliteConnection,
}

impl Storage {
    /// Connects to the database, creating schema and the progress row if absent.
    pub fn open(database_url: &str) -> Result<Self> {
        let conn = SqliteConnection::establish(database_url)
            .map_err(|e| Error::Config(format!("cannot open database {}: {}", database_url, e)))?;
        conn.batch_execute("PRAGMA foreign_keys = ON;")?;
        embedded_migrations::run(&conn)?;

        diesel::insert_or_ignore_into(progress::table)
            .values(&ProgressRecord {
                id: PROGRESS_KEY,
                last_id: 0,
                last_run_at: None,
            })
            .execute(&conn)?;

        Ok(Self { conn })
    }

    /// Runs `f` in a transaction. Every write inside is rolled back if it returns an error.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.conn.transaction(f)
    }

    /// Last comic id processed. 0 if nothing has been processed yet.
    pub fn get_progress(&self) -> Result<i32> {
        Ok(self.progress()?.map(|p| p.last_id).unwrap_or(0))
    }

    pub fn progress(&self) -> Result<Option<ProgressRecord>> {
        Ok(progress::table
            .find(PROGRESS_KEY)
            .first::<ProgressRecord>(&self.conn)
            .optional()?)
    }

    pub fn set_progress(&self, id: i32, at: NaiveDateTime) -> Result<()> {
        diesel::replace_into(progress::table)
            .values(&ProgressRecord {
                id: PROGRESS_KEY,
                last_id: id,
                last_run_at: Some(at),
            })
            .execute(&self.conn)?;
        Ok(())
    }

    pub fn comic_exists(&self, id: i32) -> Result<bool> {
        Ok(comics::table
            .find(id)
            .select(comics::id)
            .first::<i32>(&self.conn)
            .optional()?
            .is_some())
    }

    pub fn comic(&self, id: i32) -> Result<Option<ComicRecord>> {
        Ok(comics::table
            .find(id)
            .first::<ComicRecord>(&self.conn)
            .optional()?)
    }

    /// Inserts a comic, or overwrites every column of an existing row with the same id.
    pub fn upsert_comic(&self, comic: &Comic) -> Result<Upsert> {
        let record = ComicRecord::from(comic);
        self.transaction(|| {
            if self.comic_exists(record.id)? {
                diesel::update(comics::table.find(record.id))
                    .set(&record)
                    .execute(&self.conn)?;
                Ok(Upsert::Updated)
            } else {
                diesel::insert_into(comics::table)
                    .values(&record)
                    .execute(&self.conn)?;
                Ok(Upsert::Inserted)
            }
        })
    }

    /// Looks a philosopher up by `safe_name`, inserting it on first sighting.
    /// Returns the row id. A philosopher seen before keeps its original display name.
    pub fn find_or_create_philosopher(&self, philosopher: &Philosopher) -> Result<(i32, Presence)> {
        let inserted = diesel::insert_or_ignore_into(philosophers::table)
            .values(&NewPhilosopher {
                safe_name: &philosopher.safe_name,
                name: &philosopher.display_name,
            })
            .execute(&self.conn)?;

        let id = philosophers::table
            .filter(philosophers::safe_name.eq(&philosopher.safe_name))
            .select(philosophers::id)
            .first::<i32>(&self.conn)?;

        Ok((id, Presence::from_affected(inserted)))
    }

    pub fn link_philosopher(&self, philosopher_id: i32, comic_id: i32) -> Result<Presence> {
        let inserted = diesel::insert_or_ignore_into(comic_philosophers::table)
            .values(&LinkRecord {
                philosopher_id,
                comic_id,
            })
            .execute(&self.conn)?;
        Ok(Presence::from_affected(inserted))
    }

    /// Records every philosopher of a comic and links them to it.
    /// Philosophers and links that exist already are left as they are; links to
    /// philosophers no longer in `philosophers` are removed.
    pub fn link_philosophers(&self, comic_id: i32, philosophers: &[Philosopher]) -> Result<Linked> {
        self.transaction(|| {
            let mut linked = Linked::default();
            let mut ids = Vec::with_capacity(philosophers.len());
            for philosopher in philosophers {
                let (philosopher_id, presence) = self.find_or_create_philosopher(philosopher)?;
                if presence == Presence::Created {
                    linked.philosophers_created += 1;
                } else {
                    log::debug!("Philosopher {} is known already", philosopher.safe_name);
                }
                ids.push(philosopher_id);
            }

            let removed = diesel::delete(
                comic_philosophers::table
                    .filter(comic_philosophers::comic_id.eq(comic_id))
                    .filter(diesel::dsl::not(comic_philosophers::philosopher_id.eq_any(&ids))),
            )
            .execute(&self.conn)?;
            if removed > 0 {
                log::info!("Comic {}: dropped {} stale philosopher link(s)", comic_id, removed);
                linked.links_removed += removed;
            }

            for (philosopher, &philosopher_id) in philosophers.iter().zip(&ids) {
                if self.link_philosopher(philosopher_id, comic_id)? == Presence::Created {
                    linked.links_created += 1;
                } else {
                    log::debug!(
                        "Comic {} is linked to {} already",
                        comic_id,
                        philosopher.safe_name
                    );
                }
            }
            Ok(linked)
        })
    }

    /// Philosophers linked to a comic, oldest first.
    pub fn philosophers_of(&self, comic_id: i32) -> Result<Vec<PhilosopherRecord>> {
        Ok(comic_philosophers::table
            .inner_join(philosophers::table)
            .filter(comic_philosophers::comic_id.eq(comic_id))
            .select((philosophers::id, philosophers::safe_name, philosophers::name))
            .order_by(philosophers::id)
            .load::<PhilosopherRecord>(&self.conn)?)
    }

    pub fn count_comics(&self) -> Result<i64> {
        Ok(comics::table.count().get_result(&self.conn)?)
    }

    pub fn count_philosophers(&self) -> Result<i64> {
        Ok(philosophers::table.count().get_result(&self.conn)?)
    }

    pub fn count_links(&self) -> Result<i64> {
        Ok(comic_philosophers::table.count().get_result(&self.conn)?)
    }
}
