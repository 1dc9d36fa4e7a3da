//! Field- and array-level reconciliation of a local word with its remote copy
//!
//! Scalars follow the newer record. Each meaning's definition follows its own
//! edit clock and example lists are unioned.

use crate::models::{Meaning, Word};
use crate::util::push_unique;

/// Result of [`merge_with_outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Merged word; `synced` is `!needs_push`
    pub word: Word,
    /// The merged word differs from the local one
    pub changed: bool,
    /// The merged word carries local content the remote copy lacks
    pub needs_push: bool,
    /// The remote copy was older than the local row and was ignored
    pub stale_remote: bool,
}

/// Merge `remote` into `local`.
///
/// A remote copy older than the local row is ignored. Otherwise the result
/// is marked synced and `updated_at` is the max of both sides.
pub fn merge(local: &Word, remote: &Word) -> Word {
    let outcome = merge_with_outcome(local, remote);
    if outcome.stale_remote {
        return local.clone();
    }
    let mut word = outcome.word;
    word.synced = true;
    word
}

/// [`merge`] plus the bookkeeping a store needs to persist the result.
pub fn merge_with_outcome(local: &Word, remote: &Word) -> MergeOutcome {
    if remote.updated_at < local.updated_at {
        // The remote copy overwrote a newer local version; queue it again
        let mut word = local.clone();
        word.synced = false;
        return MergeOutcome {
            changed: local.synced,
            word,
            needs_push: true,
            stale_remote: true,
        };
    }

    let mut needs_push = false;
    let meanings = merge_meanings(local, remote, &mut needs_push);

    let mut likes = local.likes.clone();
    likes.extend(remote.likes.iter().map(|(k, v)| (k.clone(), *v)));
    let mut difficulties = local.difficulties.clone();
    difficulties.extend(remote.difficulties.iter().map(|(k, v)| (k.clone(), *v)));

    let word = Word {
        id: local.id.clone(),
        dictionary_id: local.dictionary_id.clone(),
        headword: remote.headword.clone(),
        meanings,
        part_of_speech: remote.part_of_speech.clone(),
        phonetic: remote.phonetic.clone(),
        tags: remote.tags.clone(),
        difficulty: remote.difficulty,
        language: remote.language.clone(),
        is_favorite: remote.is_favorite,
        created_at: local.created_at,
        updated_at: local.updated_at.max(remote.updated_at),
        synced: !needs_push,
        likes,
        difficulties,
        attribution: remote
            .attribution
            .clone()
            .or_else(|| local.attribution.clone()),
    };

    MergeOutcome {
        changed: word != *local,
        word,
        needs_push,
        stale_remote: false,
    }
}

fn merge_meanings(local: &Word, remote: &Word, needs_push: &mut bool) -> Vec<Meaning> {
    let mut merged = Vec::with_capacity(local.meanings.len().max(remote.meanings.len()));

    for local_meaning in &local.meanings {
        match remote.meanings.iter().find(|m| m.id == local_meaning.id) {
            Some(remote_meaning) => {
                merged.push(merge_meaning(local_meaning, remote_meaning, needs_push));
            }
            // Not pushed yet: a pending local addition
            None if !local.synced => {
                merged.push(local_meaning.clone());
                *needs_push = true;
            }
            // Removed remotely
            None => {}
        }
    }

    merged.extend(
        remote
            .meanings
            .iter()
            .filter(|remote_meaning| !local.meanings.iter().any(|m| m.id == remote_meaning.id))
            .cloned(),
    );

    merged.sort_by_key(|meaning| meaning.order);
    merged
}

fn merge_meaning(local: &Meaning, remote: &Meaning, needs_push: &mut bool) -> Meaning {
    let (definition, timestamp) = if remote.timestamp >= local.timestamp {
        (remote.definition.clone(), remote.timestamp)
    } else {
        if local.definition != remote.definition {
            *needs_push = true;
        }
        (local.definition.clone(), local.timestamp)
    };

    if local
        .examples
        .iter()
        .any(|example| !remote.examples.contains(example))
    {
        *needs_push = true;
    }
    let mut examples = local.examples.clone();
    for example in &remote.examples {
        push_unique(&mut examples, example);
    }

    Meaning {
        id: local.id.clone(),
        definition,
        examples,
        order: remote.order,
        timestamp,
    }
}
