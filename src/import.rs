use chrono::NaiveDate;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{SqliteGraphStore, StoreError};
use crate::graph::entity::{Node, NodeId};
use crate::graph::relationship::Edge;

/// Public movie dataset used when no source is given
pub const DEFAULT_SOURCE: &str =
    "https://raw.githubusercontent.com/tomasonjo/blog-datasets/main/movies/movies_small.csv";

const LIST_SEPARATOR: char = '|';

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y"];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read {origin}: {reason}")]
    Source { origin: String, reason: String },

    #[error("Malformed CSV at line {line}: {reason}")]
    Csv { line: usize, reason: String },

    #[error("Missing column '{0}' in CSV header")]
    MissingColumn(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One movie line of the dataset
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRow {
    pub movie_id: String,
    pub title: String,
    pub released: Option<String>,
    pub imdb_rating: Option<f64>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub movies: usize,
    pub people: usize,
    pub genres: usize,
    pub relationships: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} movies, {} people, {} genres, {} relationships",
            self.movies, self.people, self.genres, self.relationships
        )
    }
}

/// Load the movie dataset from `source` (path or http(s) URL) in one transaction
pub async fn import_movies(
    store: &SqliteGraphStore,
    source: &str,
) -> Result<ImportSummary, ImportError> {
    let text = read_source(source).await?;
    let rows = movie_rows(&text)?;
    let (nodes, edges, summary) = build_graph(&rows);

    info!("Importing {} from {}", summary, source);

    let store = store.clone();
    tokio::task::spawn_blocking(move || store.save_all_in_transaction(&nodes, &edges))
        .await
        .map_err(|e| StoreError::Unavailable(format!("Import task failed: {}", e)))??;

    Ok(summary)
}

pub async fn read_source(source: &str) -> Result<String, ImportError> {
    let source_error = |reason: String| ImportError::Source {
        origin: source.to_string(),
        reason,
    };

    if source.starts_with("http://") || source.starts_with("https://") {
        debug!("Downloading {}", source);
        let response = reqwest::get(source)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| source_error(e.to_string()))?;
        response.text().await.map_err(|e| source_error(e.to_string()))
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| source_error(e.to_string()))
    }
}

/// Split CSV text into records; quoted fields may hold commas, newlines and `""`
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, ImportError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            '"' => {
                return Err(ImportError::Csv {
                    line,
                    reason: "unexpected quote inside unquoted field".to_string(),
                })
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ImportError::Csv {
            line: record_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }

    Ok(records)
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    // Blank lines carry no data
    if record.len() == 1 && record[0].trim().is_empty() {
        return;
    }
    records.push(record);
}

/// Parse the dataset into movie rows, locating columns by header name
pub fn movie_rows(text: &str) -> Result<Vec<MovieRow>, ImportError> {
    let mut records = parse_csv(text)?.into_iter();
    let header = records
        .next()
        .ok_or_else(|| ImportError::MissingColumn("movieId".to_string()))?;

    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().trim_end_matches(LIST_SEPARATOR) == name)
            .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
    };
    let movie_id = column("movieId")?;
    let title = column("title")?;
    let released = column("released")?;
    let rating = column("imdbRating")?;
    let director = column("director")?;
    let actors = column("actors")?;
    let genres = column("genres")?;

    let mut rows = Vec::new();
    for (idx, record) in records.enumerate() {
        let get = |i: usize| record.get(i).map(|s| s.trim()).unwrap_or_default();

        if get(title).is_empty() {
            warn!("Skipping record {} without a title", idx + 2);
            continue;
        }

        rows.push(MovieRow {
            movie_id: get(movie_id).to_string(),
            title: get(title).to_string(),
            released: normalize_date(get(released)),
            imdb_rating: get(rating).parse::<f64>().ok(),
            directors: split_list(get(director)),
            actors: split_list(get(actors)),
            genres: split_list(get(genres)),
        });
    }

    Ok(rows)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Dates become `YYYY-MM-DD`; unrecognised text is kept as written
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    debug!("Keeping unrecognised release date '{}'", raw);
    Some(raw.to_string())
}

/// Turn rows into deduplicated nodes and edges
pub fn build_graph(rows: &[MovieRow]) -> (Vec<Node>, Vec<Edge>, ImportSummary) {
    let mut movies: BTreeMap<NodeId, Node> = BTreeMap::new();
    let mut people: BTreeMap<NodeId, Node> = BTreeMap::new();
    let mut genres: BTreeMap<NodeId, Node> = BTreeMap::new();
    let mut edges: BTreeMap<String, Edge> = BTreeMap::new();

    let mut add_edge = |edge: Edge| {
        edges.insert(edge.id.as_str().to_string(), edge);
    };

    for row in rows {
        let key = if row.movie_id.is_empty() {
            &row.title
        } else {
            &row.movie_id
        };
        let mut movie = Node::new(NodeId::scoped("Movie", key), "Movie", &row.title);
        if let Some(released) = &row.released {
            movie = movie.with_property("released", json!(released));
        }
        if let Some(rating) = row.imdb_rating {
            movie = movie.with_property("imdbRating", json!(rating));
        }
        let movie_id = movie.id.clone();
        movies.insert(movie_id.clone(), movie);

        for (names, rel_type) in [(&row.directors, "DIRECTED"), (&row.actors, "ACTED_IN")] {
            for name in names {
                let person = Node::new(NodeId::scoped("Person", name), "Person", name);
                add_edge(Edge::new(person.id.clone(), movie_id.clone(), rel_type));
                people.entry(person.id.clone()).or_insert(person);
            }
        }

        for name in &row.genres {
            let genre = Node::new(NodeId::scoped("Genre", name), "Genre", name);
            add_edge(Edge::new(movie_id.clone(), genre.id.clone(), "IN_GENRE"));
            genres.entry(genre.id.clone()).or_insert(genre);
        }
    }

    let summary = ImportSummary {
        movies: movies.len(),
        people: people.len(),
        genres: genres.len(),
        relationships: edges.len(),
    };

    let nodes = movies
        .into_values()
        .chain(people.into_values())
        .chain(genres.into_values())
        .collect();

    (nodes, edges.into_values().collect(), summary)
}
