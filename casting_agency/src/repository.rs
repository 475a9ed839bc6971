//! Storage for movies and actors

use std::{collections::BTreeMap, error::Error, fmt::Debug};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::{Actor, ActorPatch, Movie, MoviePatch, NewActor, NewMovie};

/// The backing store could not complete an operation
#[derive(Debug, Error)]
#[error("repository unavailable")]
pub struct RepositoryError {
    #[source]
    source: Box<dyn Error + Send + Sync + 'static>,
}

impl RepositoryError {
    /// Wraps the underlying failure
    pub fn unavailable(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// A store of movies and actors
///
/// Lookups, updates, and deletions of unknown ids return `Ok(None)`.
#[async_trait]
pub trait Repository: Debug + Send + Sync {
    /// Lists every movie, ordered by id
    async fn movies(&self) -> Result<Vec<Movie>, RepositoryError>;

    /// Looks up a movie
    async fn movie(&self, id: u64) -> Result<Option<Movie>, RepositoryError>;

    /// Stores a new movie and returns it with its assigned id
    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie, RepositoryError>;

    /// Applies a partial update to a movie
    async fn update_movie(&self, id: u64, patch: MoviePatch)
        -> Result<Option<Movie>, RepositoryError>;

    /// Removes a movie, returning what was removed
    async fn delete_movie(&self, id: u64) -> Result<Option<Movie>, RepositoryError>;

    /// Lists every actor, ordered by id
    async fn actors(&self) -> Result<Vec<Actor>, RepositoryError>;

    /// Looks up an actor
    async fn actor(&self, id: u64) -> Result<Option<Actor>, RepositoryError>;

    /// Stores a new actor and returns it with its assigned id
    async fn insert_actor(&self, actor: NewActor) -> Result<Actor, RepositoryError>;

    /// Applies a partial update to an actor
    async fn update_actor(&self, id: u64, patch: ActorPatch)
        -> Result<Option<Actor>, RepositoryError>;

    /// Removes an actor, returning what was removed
    async fn delete_actor(&self, id: u64) -> Result<Option<Actor>, RepositoryError>;
}

/// A process-local repository
///
/// Ids start at 1 and are never reused, even after a deletion.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    movies: BTreeMap<u64, Movie>,
    actors: BTreeMap<u64, Actor>,
    last_movie_id: u64,
    last_actor_id: u64,
}

impl InMemoryRepository {
    /// Constructs an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn movies(&self) -> Result<Vec<Movie>, RepositoryError> {
        Ok(self.tables.read().await.movies.values().cloned().collect())
    }

    async fn movie(&self, id: u64) -> Result<Option<Movie>, RepositoryError> {
        Ok(self.tables.read().await.movies.get(&id).cloned())
    }

    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.last_movie_id += 1;
        let movie = movie.into_movie(tables.last_movie_id);
        tables.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn update_movie(
        &self,
        id: u64,
        patch: MoviePatch,
    ) -> Result<Option<Movie>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.movies.get_mut(&id).map(|movie| {
            patch.apply(movie);
            movie.clone()
        }))
    }

    async fn delete_movie(&self, id: u64) -> Result<Option<Movie>, RepositoryError> {
        Ok(self.tables.write().await.movies.remove(&id))
    }

    async fn actors(&self) -> Result<Vec<Actor>, RepositoryError> {
        Ok(self.tables.read().await.actors.values().cloned().collect())
    }

    async fn actor(&self, id: u64) -> Result<Option<Actor>, RepositoryError> {
        Ok(self.tables.read().await.actors.get(&id).cloned())
    }

    async fn insert_actor(&self, actor: NewActor) -> Result<Actor, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.last_actor_id += 1;
        let actor = actor.into_actor(tables.last_actor_id);
        tables.actors.insert(actor.id, actor.clone());
        Ok(actor)
    }

    async fn update_actor(
        &self,
        id: u64,
        patch: ActorPatch,
    ) -> Result<Option<Actor>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.actors.get_mut(&id).map(|actor| {
            patch.apply(actor);
            actor.clone()
        }))
    }

    async fn delete_actor(&self, id: u64) -> Result<Option<Actor>, RepositoryError> {
        Ok(self.tables.write().await.actors.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    fn heat() -> NewMovie {
        NewMovie {
            title: "Heat".into(),
            release_date: "1995-12-15".into(),
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_in_order_and_not_reused() -> Result<()> {
        let repo = InMemoryRepository::new();
        let first = repo.insert_movie(heat()).await?;
        let second = repo.insert_movie(heat()).await?;
        assert_eq!((first.id, second.id), (1, 2));

        repo.delete_movie(second.id).await?;
        let third = repo.insert_movie(heat()).await?;
        assert_eq!(third.id, 3);

        let ids: Vec<u64> = repo.movies().await?.iter().map(|m| m.id).collect();
        assert_eq!(ids, [1, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn update_applies_patch() -> Result<()> {
        let repo = InMemoryRepository::new();
        let actor = repo
            .insert_actor(NewActor {
                name: "Val".into(),
                age: 34,
                gender: "male".into(),
            })
            .await?;

        let updated = repo
            .update_actor(
                actor.id,
                ActorPatch {
                    age: Some(35),
                    ..ActorPatch::default()
                },
            )
            .await?;

        assert_eq!(updated.map(|a| a.age), Some(35));
        assert_eq!(repo.actor(actor.id).await?.map(|a| a.age), Some(35));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_ids_are_absent() -> Result<()> {
        let repo = InMemoryRepository::new();
        assert!(repo.movie(42).await?.is_none());
        assert!(repo.update_movie(42, MoviePatch::default()).await?.is_none());
        assert!(repo.delete_actor(42).await?.is_none());
        Ok(())
    }
}
