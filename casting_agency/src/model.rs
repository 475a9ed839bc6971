//! Movies and actors managed by the agency

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A movie in the agency's catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// Assigned by the repository on insert
    pub id: u64,
    /// Movie title
    pub title: String,
    /// Release date, as provided by the client
    pub release_date: String,
}

/// A request to add a movie
///
/// Every field is required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovie {
    /// Movie title
    pub title: String,
    /// Release date
    pub release_date: String,
}

impl NewMovie {
    /// Rejects blank fields
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unprocessable`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ApiError> {
        not_blank("title", &self.title)?;
        not_blank("release_date", &self.release_date)
    }

    /// Builds the stored movie under the given id
    pub fn into_movie(self, id: u64) -> Movie {
        Movie {
            id,
            title: self.title,
            release_date: self.release_date,
        }
    }
}

/// A partial update to a movie
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoviePatch {
    /// Replacement title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Replacement release date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

impl MoviePatch {
    /// Rejects blank replacement values
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unprocessable`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            not_blank("title", title)?;
        }
        if let Some(release_date) = &self.release_date {
            not_blank("release_date", release_date)?;
        }
        Ok(())
    }

    /// Overwrites the fields present in the patch
    pub fn apply(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(release_date) = self.release_date {
            movie.release_date = release_date;
        }
    }
}

/// An actor represented by the agency
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Assigned by the repository on insert
    pub id: u64,
    /// Actor name
    pub name: String,
    /// Age in years
    pub age: u32,
    /// Gender, as provided by the client
    pub gender: String,
}

/// A request to add an actor
///
/// Every field is required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActor {
    /// Actor name
    pub name: String,
    /// Age in years
    pub age: u32,
    /// Gender
    pub gender: String,
}

impl NewActor {
    /// Rejects blank fields
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unprocessable`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ApiError> {
        not_blank("name", &self.name)?;
        not_blank("gender", &self.gender)
    }

    /// Builds the stored actor under the given id
    pub fn into_actor(self, id: u64) -> Actor {
        Actor {
            id,
            name: self.name,
            age: self.age,
            gender: self.gender,
        }
    }
}

/// A partial update to an actor
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorPatch {
    /// Replacement name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Replacement age
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Replacement gender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl ActorPatch {
    /// Rejects blank replacement values
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unprocessable`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            not_blank("name", name)?;
        }
        if let Some(gender) = &self.gender {
            not_blank("gender", gender)?;
        }
        Ok(())
    }

    /// Overwrites the fields present in the patch
    pub fn apply(self, actor: &mut Actor) {
        if let Some(name) = self.name {
            actor.name = name;
        }
        if let Some(age) = self.age {
            actor.age = age;
        }
        if let Some(gender) = self.gender {
            actor.gender = gender;
        }
    }
}

fn not_blank(field: &'static str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::Unprocessable(field))
    } else {
        Ok(())
    }
}
