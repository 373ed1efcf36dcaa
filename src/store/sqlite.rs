use anyhow::Result;
use rusqlite::{Connection, params};
use std::collections::HashSet;

use crate::domain::email::EmailId;
use crate::store::repo::{DownloadHistory, DownloadItem, DownloadRecord};

pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.migrate()?;
        Ok(repo)
    }

    pub fn open_in_memory() -> Result<Self> {
        let repo = Self {
            conn: Connection::open_in_memory()?,
        };
        repo.migrate()?;
        Ok(repo)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS downloads (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                saved_at      INTEGER NOT NULL,
                archive_path  TEXT NOT NULL,
                user_email    TEXT
            );

            CREATE TABLE IF NOT EXISTS download_items (
                download_id      INTEGER NOT NULL REFERENCES downloads(id),
                message_id       TEXT NOT NULL,
                subject          TEXT NOT NULL,
                sender           TEXT NOT NULL,
                filename         TEXT NOT NULL,
                generation_code  TEXT,
                issuer_name      TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_items_message ON download_items(message_id);
            "#,
        )?;
        Ok(())
    }

    fn items_for(&self, download_id: i64) -> Result<Vec<DownloadItem>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT message_id, subject, sender, filename, generation_code, issuer_name
            FROM download_items
            WHERE download_id=?1
            ORDER BY rowid
            "#,
        )?;
        let mut rows = stmt.query(params![download_id])?;
        let mut out = Vec::new();
        while let Some(r) = rows.next()? {
            out.push(DownloadItem {
                message_id: r.get(0)?,
                subject: r.get(1)?,
                sender: r.get(2)?,
                filename: r.get(3)?,
                generation_code: r.get(4)?,
                issuer_name: r.get(5)?,
            });
        }
        Ok(out)
    }
}

impl DownloadHistory for SqliteHistory {
    fn record(&self, record: &DownloadRecord) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO downloads (saved_at, archive_path, user_email)
            VALUES (?1, ?2, ?3)
            "#,
            params![record.saved_at, record.archive_path, record.user_email],
        )?;
        let id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO download_items
                  (download_id, message_id, subject, sender, filename, generation_code, issuer_name)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for it in &record.items {
                stmt.execute(params![
                    id,
                    it.message_id,
                    it.subject,
                    it.sender,
                    it.filename,
                    it.generation_code,
                    it.issuer_name
                ])?;
            }
        }
        tx.commit()?;
        Ok(id)
    }

    fn recent(&self, limit: usize) -> Result<Vec<DownloadRecord>> {
        let mut heads = Vec::new();
        {
            let mut stmt = self.conn.prepare(
                r#"
                SELECT id, saved_at, archive_path, user_email
                FROM downloads
                ORDER BY saved_at DESC, id DESC
                LIMIT ?1
                "#,
            )?;
            let mut rows = stmt.query(params![limit as i64])?;
            while let Some(r) = rows.next()? {
                let id: i64 = r.get(0)?;
                let saved_at: i64 = r.get(1)?;
                let archive_path: String = r.get(2)?;
                let user_email: Option<String> = r.get(3)?;
                heads.push((id, saved_at, archive_path, user_email));
            }
        }

        heads
            .into_iter()
            .map(|(id, saved_at, archive_path, user_email)| -> Result<DownloadRecord> {
                Ok(DownloadRecord {
                    id: Some(id),
                    saved_at,
                    archive_path,
                    user_email,
                    items: self.items_for(id)?,
                })
            })
            .collect()
    }

    fn downloaded_ids(&self) -> Result<HashSet<EmailId>> {
        let mut stmt = self
            .conn
            .prepare(r#"SELECT DISTINCT message_id FROM download_items"#)?;
        let mut rows = stmt.query([])?;
        let mut out = HashSet::new();
        while let Some(r) = rows.next()? {
            out.insert(r.get(0)?);
        }
        Ok(out)
    }
}
