//! The closed set of tenant-owned entity kinds.
//!
//! The lowercase name of each variant doubles as its URL segment
//! (`/job/{company_id}`) and as the `kind` column stored in the database.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Whether rows of a kind are mutable resources or append-only events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindClass {
  /// Staff-maintained content; created and updated, never deleted directly.
  Owned,
  /// Chatbot analytics; inserted once, never updated.
  Event,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Kind {
  // ── Owned resources ─────────────────────────────────────────────────────
  Location,
  /// A job posting.
  Job,
  /// Maps a specialism to the job categories the chatbot offers.
  JobMap,
  Benefit,
  /// A FAQ entry.
  Question,
  /// A FAQ topic grouping questions.
  QuestionTopic,
  RoleType,
  /// The per-company chatbot profile.
  CompanyChatbot,

  // ── Analytics events ────────────────────────────────────────────────────
  /// A job-search conversation.
  JobsData,
  /// A question conversation.
  QnsData,
  /// A browsing session.
  BrowsingData,
}

impl Kind {
  /// The URL segment and storage discriminant.
  pub fn segment(self) -> &'static str { self.into() }

  pub fn class(self) -> KindClass {
    match self {
      Self::JobsData | Self::QnsData | Self::BrowsingData => KindClass::Event,
      _ => KindClass::Owned,
    }
  }

  pub fn is_event(self) -> bool { self.class() == KindClass::Event }

  /// Kinds carrying an `active` flag that gates visibility in listings.
  pub fn is_publishable(self) -> bool {
    matches!(self, Self::Job | Self::Benefit | Self::Question)
  }

  /// Kinds whose mutations produce a [`crate::change::ChangeEvent`].
  pub fn emits_changes(self) -> bool {
    matches!(
      self,
      Self::Location
        | Self::Job
        | Self::JobMap
        | Self::Benefit
        | Self::Question
        | Self::CompanyChatbot
    )
  }
}
