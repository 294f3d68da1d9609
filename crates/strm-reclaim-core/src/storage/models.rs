/// One historical transfer: a source file ingested into the local library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub id: i64,
    pub src: Option<String>,
    pub dest: Option<String>,
    pub tmdb_id: Option<i64>,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub download_hash: Option<String>,
}

/// Insert payload for [`TransferRecord`].
#[derive(Debug, Clone, Default)]
pub struct NewTransfer {
    pub src: Option<String>,
    pub dest: Option<String>,
    pub tmdb_id: Option<i64>,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub download_hash: Option<String>,
}
