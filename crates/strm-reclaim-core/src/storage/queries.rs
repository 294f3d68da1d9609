use super::models::{NewTransfer, TransferRecord};
use super::sqlite::Database;
use crate::index::{DownloadIndex, TransferIndex};
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

const TRANSFER_COLUMNS: &str = "id, src, dest, tmdbid, season, episode, download_hash";

fn transfer_from_row(row: &Row) -> Result<TransferRecord> {
    Ok(TransferRecord {
        id: row.get(0)?,
        src: row.get(1)?,
        dest: row.get(2)?,
        tmdb_id: row.get(3)?,
        season: row.get(4)?,
        episode: row.get(5)?,
        download_hash: row.get(6)?,
    })
}

impl Database {
    // ── Transfer history ─────────────────────────────────────────

    pub fn insert_transfer(&self, record: &NewTransfer) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        self.connection().execute(
            "INSERT INTO transfer_history \
             (src, dest, tmdbid, season, episode, download_hash, date) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.src,
                record.dest,
                record.tmdb_id,
                record.season,
                record.episode,
                record.download_hash,
                now
            ],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    pub fn get_transfers_by_tmdb(
        &self,
        tmdb_id: i64,
        season: Option<&str>,
        episode: Option<&str>,
    ) -> Result<Vec<TransferRecord>> {
        let records = match (season, episode) {
            (Some(season), Some(episode)) => {
                let mut stmt = self.connection().prepare(&format!(
                    "SELECT {} FROM transfer_history \
                     WHERE tmdbid = ?1 AND season = ?2 AND episode = ?3 ORDER BY id",
                    TRANSFER_COLUMNS
                ))?;
                let rows = stmt.query_map(params![tmdb_id, season, episode], transfer_from_row)?;
                rows.collect::<Result<Vec<_>>>()?
            }
            _ => {
                let mut stmt = self.connection().prepare(&format!(
                    "SELECT {} FROM transfer_history WHERE tmdbid = ?1 ORDER BY id",
                    TRANSFER_COLUMNS
                ))?;
                let rows = stmt.query_map(params![tmdb_id], transfer_from_row)?;
                rows.collect::<Result<Vec<_>>>()?
            }
        };
        Ok(records)
    }

    pub fn get_transfer_by_dest(&self, dest: &str) -> Result<Option<TransferRecord>> {
        self.connection()
            .query_row(
                &format!(
                    "SELECT {} FROM transfer_history WHERE dest = ?1 ORDER BY id DESC LIMIT 1",
                    TRANSFER_COLUMNS
                ),
                params![dest],
                transfer_from_row,
            )
            .optional()
    }

    pub fn delete_transfer(&self, id: i64) -> Result<usize> {
        let removed = self
            .connection()
            .execute("DELETE FROM transfer_history WHERE id = ?1", params![id])?;
        debug!("Deleted transfer record {} ({} rows)", id, removed);
        Ok(removed)
    }

    pub fn count_transfers(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM transfer_history", [], |row| row.get(0))
    }

    // ── Download history ─────────────────────────────────────────

    pub fn insert_download_file(&self, download_hash: &str, fullpath: &str) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO download_files (download_hash, fullpath) VALUES (?1, ?2)",
            params![download_hash, fullpath],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    pub fn get_hash_by_fullpath(&self, fullpath: &str) -> Result<Option<String>> {
        self.connection()
            .query_row(
                "SELECT download_hash FROM download_files \
                 WHERE fullpath = ?1 ORDER BY id DESC LIMIT 1",
                params![fullpath],
                |row| row.get(0),
            )
            .optional()
    }
}

impl TransferIndex for Database {
    fn query_by_identity(
        &self,
        tmdb_id: u64,
        season: Option<&str>,
        episode: Option<&str>,
    ) -> crate::error::Result<Vec<TransferRecord>> {
        let id = i64::try_from(tmdb_id)
            .map_err(|_| crate::Error::Index(format!("tmdb id {} out of range", tmdb_id)))?;
        Ok(self.get_transfers_by_tmdb(id, season, episode)?)
    }

    fn query_by_destination(&self, dest: &str) -> crate::error::Result<Option<TransferRecord>> {
        Ok(self.get_transfer_by_dest(dest)?)
    }

    fn delete_by_id(&self, id: i64) -> crate::error::Result<()> {
        self.delete_transfer(id)?;
        Ok(())
    }
}

impl DownloadIndex for Database {
    fn hash_for_path(&self, path: &str) -> crate::error::Result<Option<String>> {
        Ok(self.get_hash_by_fullpath(path)?)
    }
}
