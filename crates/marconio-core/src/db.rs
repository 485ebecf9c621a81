//! Local SQLite cache of channels and mixtapes.
//!
//! Nested records (broadcasts, media, links) are stored as JSON blobs. Every
//! successful write re-reads both tables and pushes the result to
//! [`DatabaseClient::observe`] subscribers.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};
use url::Url;

use marconio_proto::{Channel, Mixtape};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    #[error("unable to write: {0}")]
    UnableToWrite(String),
    #[error("unable to read: {0}")]
    UnableToRead(String),
}

/// Full contents of the cache, as delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheContents {
    pub channels: Vec<Channel>,
    pub mixtapes: Vec<Mixtape>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS channel (
    channel_name TEXT PRIMARY KEY NOT NULL,
    now BLOB NOT NULL,
    next BLOB NOT NULL
);
CREATE TABLE IF NOT EXISTS mixtape (
    mixtape_alias TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    subtitle TEXT NOT NULL,
    description TEXT NOT NULL,
    description_html TEXT NOT NULL,
    audio_stream_endpoint TEXT NOT NULL,
    media BLOB NOT NULL,
    now_playing_topic TEXT NOT NULL,
    links BLOB NOT NULL
);
";

#[derive(Clone)]
pub struct DatabaseClient {
    conn: Arc<Mutex<Connection>>,
    updates: broadcast::Sender<CacheContents>,
}

impl DatabaseClient {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DbError::UnableToWrite(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(write_err)?;
        info!("db: opened {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::with_connection(Connection::open_in_memory().map_err(write_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DbError> {
        conn.execute_batch(SCHEMA).map_err(write_err)?;
        let (updates, _) = broadcast::channel(16);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            updates,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn
            .lock()
            .map_err(|_| DbError::UnableToRead("connection lock poisoned".into()))
    }

    pub fn write_channels(&self, channels: &[Channel]) -> Result<(), DbError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction().map_err(write_err)?;
            for channel in channels {
                tx.execute(
                    "INSERT OR REPLACE INTO channel (channel_name, now, next) VALUES (?1, ?2, ?3)",
                    params![
                        channel.channel_name,
                        to_blob(&channel.now)?,
                        to_blob(&channel.next)?
                    ],
                )
                .map_err(write_err)?;
            }
            tx.commit().map_err(write_err)?;
        }
        debug!("db: wrote {} channels", channels.len());
        self.notify();
        Ok(())
    }

    pub fn write_mixtapes(&self, mixtapes: &[Mixtape]) -> Result<(), DbError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction().map_err(write_err)?;
            for m in mixtapes {
                tx.execute(
                    "INSERT OR REPLACE INTO mixtape (mixtape_alias, title, subtitle, description, \
                     description_html, audio_stream_endpoint, media, now_playing_topic, links) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        m.mixtape_alias,
                        m.title,
                        m.subtitle,
                        m.description,
                        m.description_html,
                        m.audio_stream_endpoint.as_str(),
                        to_blob(&m.media)?,
                        m.now_playing_topic,
                        to_blob(&m.links)?
                    ],
                )
                .map_err(write_err)?;
            }
            tx.commit().map_err(write_err)?;
        }
        debug!("db: wrote {} mixtapes", mixtapes.len());
        self.notify();
        Ok(())
    }

    pub fn fetch_all_channels(&self) -> Result<Vec<Channel>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT channel_name, now, next FROM channel ORDER BY channel_name ASC")
            .map_err(read_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(read_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;

        rows.into_iter()
            .map(|(channel_name, now, next)| {
                Ok(Channel {
                    channel_name,
                    now: from_blob(&now)?,
                    next: from_blob(&next)?,
                })
            })
            .collect()
    }

    pub fn fetch_all_mixtapes(&self) -> Result<Vec<Mixtape>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT mixtape_alias, title, subtitle, description, description_html, \
                 audio_stream_endpoint, media, now_playing_topic, links \
                 FROM mixtape ORDER BY title ASC",
            )
            .map_err(read_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MixtapeRow {
                    mixtape_alias: row.get(0)?,
                    title: row.get(1)?,
                    subtitle: row.get(2)?,
                    description: row.get(3)?,
                    description_html: row.get(4)?,
                    audio_stream_endpoint: row.get(5)?,
                    media: row.get(6)?,
                    now_playing_topic: row.get(7)?,
                    links: row.get(8)?,
                })
            })
            .map_err(read_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;

        rows.into_iter().map(MixtapeRow::into_mixtape).collect()
    }

    pub fn fetch_all(&self) -> Result<CacheContents, DbError> {
        Ok(CacheContents {
            channels: self.fetch_all_channels()?,
            mixtapes: self.fetch_all_mixtapes()?,
        })
    }

    /// Receive the whole cache after every successful write.
    pub fn observe(&self) -> broadcast::Receiver<CacheContents> {
        self.updates.subscribe()
    }

    fn notify(&self) {
        if self.updates.receiver_count() == 0 {
            return;
        }
        match self.fetch_all() {
            Ok(contents) => {
                let _ = self.updates.send(contents);
            }
            Err(e) => debug!("db: skipping observer update: {}", e),
        }
    }
}

struct MixtapeRow {
    mixtape_alias: String,
    title: String,
    subtitle: String,
    description: String,
    description_html: String,
    audio_stream_endpoint: String,
    media: Vec<u8>,
    now_playing_topic: String,
    links: Vec<u8>,
}

impl MixtapeRow {
    fn into_mixtape(self) -> Result<Mixtape, DbError> {
        Ok(Mixtape {
            audio_stream_endpoint: Url::parse(&self.audio_stream_endpoint)
                .map_err(|e| DbError::UnableToRead(e.to_string()))?,
            media: from_blob(&self.media)?,
            links: from_blob(&self.links)?,
            mixtape_alias: self.mixtape_alias,
            title: self.title,
            subtitle: self.subtitle,
            description: self.description,
            description_html: self.description_html,
            now_playing_topic: self.now_playing_topic,
        })
    }
}

fn to_blob<T: Serialize>(value: &T) -> Result<Vec<u8>, DbError> {
    serde_json::to_vec(value).map_err(|e| DbError::UnableToWrite(e.to_string()))
}

fn from_blob<T: DeserializeOwned>(blob: &[u8]) -> Result<T, DbError> {
    serde_json::from_slice(blob).map_err(|e| DbError::UnableToRead(e.to_string()))
}

fn write_err(e: rusqlite::Error) -> DbError {
    DbError::UnableToWrite(e.to_string())
}

fn read_err(e: rusqlite::Error) -> DbError {
    DbError::UnableToRead(e.to_string())
}
