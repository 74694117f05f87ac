use crate::page::Comic;
use crate::schema::{comic_philosophers, comics, philosophers, progress};
use chrono::NaiveDateTime;

/// Separator of `file_paths` and `image_urls` columns.
pub const PATH_DELIMITER: &str = "|";
/// Separator of `philosopher_names` column.
pub const NAME_DELIMITER: &str = ", ";

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[table_name = "comics"]
pub struct ComicRecord {
    pub id: i32,
    pub title: String,
    pub alt: String,
    pub explanation: String,
    pub image_urls: String,
    pub file_paths: String,
    pub image_count: i32,
    pub philosopher_names: String,
    pub philosopher_count: i32,
    pub collected_at: NaiveDateTime,
}

impl ComicRecord {
    pub fn file_paths(&self) -> Vec<&str> {
        split_nonempty(&self.file_paths, PATH_DELIMITER)
    }

    pub fn image_urls(&self) -> Vec<&str> {
        split_nonempty(&self.image_urls, PATH_DELIMITER)
    }
}

impl From<&Comic> for ComicRecord {
    fn from(comic: &Comic) -> Self {
        Self {
            id: comic.id,
            title: comic.title.clone(),
            alt: comic.alt_text.clone(),
            explanation: comic.explanation.clone(),
            image_urls: comic.image_urls.join(PATH_DELIMITER),
            file_paths: comic.file_paths.join(PATH_DELIMITER),
            image_count: comic.image_count() as i32,
            philosopher_names: comic
                .philosophers
                .iter()
                .map(|p| p.display_name.as_str())
                .collect::<Vec<_>>()
                .join(NAME_DELIMITER),
            philosopher_count: comic.philosophers.len() as i32,
            collected_at: comic.collected_at,
        }
    }
}

fn split_nonempty<'a>(s: &'a str, delimiter: &str) -> Vec<&'a str> {
    s.split(delimiter).filter(|x| !x.is_empty()).collect()
}

#[derive(Queryable, Debug, Clone, PartialEq)]
pub struct PhilosopherRecord {
    pub id: i32,
    pub safe_name: String,
    pub name: String,
}

#[derive(Insertable, Debug)]
#[table_name = "philosophers"]
pub(crate) struct NewPhilosopher<'a> {
    pub(crate) safe_name: &'a str,
    pub(crate) name: &'a str,
}

#[derive(Queryable, Insertable, Debug, Clone, Copy, PartialEq, Eq)]
#[table_name = "comic_philosophers"]
pub struct LinkRecord {
    pub philosopher_id: i32,
    pub comic_id: i32,
}

#[derive(Queryable, Insertable, Debug, Clone, PartialEq)]
#[table_name = "progress"]
pub struct ProgressRecord {
    pub id: i32,
    pub last_id: i32,
    pub last_run_at: Option<NaiveDateTime>,
}
