//! Shared fixtures for unit tests.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use crate::db::{GraphStore, Params, Record, SqliteGraphStore, StoreConfig, StoreError};
use crate::graph::entity::{Node, NodeId};
use crate::graph::relationship::Edge;

/// Small movie graph; the TempDir must outlive the store
pub fn movie_store() -> (TempDir, Arc<SqliteGraphStore>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("movies.db");
    let store = SqliteGraphStore::connect(&StoreConfig::new(path.to_str().unwrap())).unwrap();

    let inception = Node::new(NodeId::new("movie:inception"), "Movie", "Inception")
        .with_property("released", json!("2010-07-16"))
        .with_property("imdbRating", json!(8.8));
    let interstellar = Node::new(NodeId::new("movie:interstellar"), "Movie", "Interstellar")
        .with_property("released", json!("2014-11-07"));
    let matrix = Node::new(NodeId::new("movie:the matrix"), "Movie", "The Matrix")
        .with_property("released", json!("1999-03-31"))
        .with_property("imdbRating", json!(8.7));
    let nolan = Node::new(NodeId::scoped("Person", "Christopher Nolan"), "Person", "Christopher Nolan")
        .with_property("born", json!(1970));
    let dicaprio = Node::new(NodeId::scoped("Person", "Leonardo DiCaprio"), "Person", "Leonardo DiCaprio");
    let keanu = Node::new(NodeId::scoped("Person", "Keanu Reeves"), "Person", "Keanu Reeves")
        .with_property("born", json!(1964));
    let lana = Node::new(NodeId::scoped("Person", "Lana Wachowski"), "Person", "Lana Wachowski");
    let scifi = Node::new(NodeId::scoped("Genre", "Sci-Fi"), "Genre", "Sci-Fi");

    let edges = vec![
        Edge::new(inception.id.clone(), nolan.id.clone(), "DIRECTED_BY"),
        Edge::new(nolan.id.clone(), interstellar.id.clone(), "DIRECTED"),
        Edge::new(dicaprio.id.clone(), inception.id.clone(), "ACTED_IN"),
        Edge::new(inception.id.clone(), scifi.id.clone(), "IN_GENRE"),
        Edge::new(keanu.id.clone(), matrix.id.clone(), "ACTED_IN"),
        Edge::new(lana.id.clone(), matrix.id.clone(), "DIRECTED"),
        Edge::new(matrix.id.clone(), scifi.id.clone(), "IN_GENRE"),
    ];
    let nodes = vec![
        inception,
        interstellar,
        matrix,
        nolan,
        dicaprio,
        keanu,
        lana,
        scifi,
    ];

    store.save_all_in_transaction(&nodes, &edges).unwrap();
    (dir, Arc::new(store))
}

/// A store whose connection is gone
pub struct UnavailableStore;

#[async_trait]
impl GraphStore for UnavailableStore {
    async fn query(&self, _statement: &str, _params: &Params) -> Result<Vec<Record>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}
