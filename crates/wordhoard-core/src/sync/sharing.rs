//! Shared dictionaries: promotion, membership and per-collaborator fields

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::batch::BatchCommitter;
use super::clock::Clock;
use super::engine::SyncEngine;
use super::error::{SyncError, SyncResult};
use super::identity::{authorize, Identity, SyncEntitlement};
use super::score::update_score;
use crate::models::{Attribution, Collaborator, Role, SharedDictionary, Word, WordId};
use crate::remote::{codec, DocPath, FieldPath, RemoteStore, WriteOp};
use crate::services::LocalStore;
use crate::Error;

pub struct SharingService {
    store: LocalStore,
    remote: Arc<dyn RemoteStore>,
    entitlement: Arc<dyn SyncEntitlement>,
    clock: Arc<dyn Clock>,
    committer: BatchCommitter,
}

impl SharingService {
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteStore>,
        entitlement: Arc<dyn SyncEntitlement>,
        clock: Arc<dyn Clock>,
        committer: BatchCommitter,
    ) -> Self {
        Self {
            store,
            remote,
            entitlement,
            clock,
            committer,
        }
    }

    /// Build a service sharing the engine's store, remote and committer.
    pub fn for_engine(engine: &SyncEngine) -> Self {
        Self::new(
            engine.store().clone(),
            engine.remote(),
            engine.entitlement(),
            engine.clock(),
            engine.committer().clone(),
        )
    }

    /// Convert the owner's private dictionary into a new shared dictionary.
    ///
    /// Word copies are committed first and the dictionary document last, so a
    /// failed promotion never lists a half-filled dictionary; copies that did
    /// commit are removed again. Local rows move to the new scope only after
    /// everything committed, and the private remote copies are removed last.
    pub async fn promote_private(
        &self,
        owner: &Identity,
        name: &str,
    ) -> SyncResult<SharedDictionary> {
        let user_id = authorize(self.entitlement.as_ref(), &owner.user_id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Dictionary name cannot be empty".into()).into());
        }

        let now = self.clock.now_millis();
        let dictionary = SharedDictionary {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            owner: user_id.to_string(),
            collaborators: BTreeMap::from([(user_id.to_string(), Role::Owner)]),
            created_at: now,
        };
        let membership = Collaborator {
            user_id: user_id.to_string(),
            email: owner.email.clone(),
            display_name: owner.display_name.clone(),
            role: Role::Owner,
            added_at: now,
        };

        let words = self.store.words_in_scope(None).await?;
        let mut copies = Vec::with_capacity(words.len());
        let mut ops = Vec::with_capacity(words.len() + 2);
        for word in &words {
            let mut copy = word.clone();
            copy.dictionary_id = Some(dictionary.id.clone());
            if copy.attribution.is_none() {
                copy.attribution = Some(Attribution {
                    added_by_email: owner.email.clone(),
                    added_by_display_name: owner.display_name.clone(),
                    added_at: word.created_at,
                });
            }
            let path = DocPath::dictionary_word(&dictionary.id, word.id.as_str())?;
            ops.push(WriteOp::Set {
                path: path.clone(),
                data: codec::encode_word(&copy)?,
            });
            copies.push(path);
        }
        // The dictionary becomes visible only with its last chunk
        ops.push(WriteOp::Set {
            path: DocPath::collaborator(&dictionary.id, user_id)?,
            data: codec::encode_collaborator(&membership)?,
        });
        ops.push(WriteOp::Set {
            path: DocPath::dictionary(&dictionary.id)?,
            data: codec::encode_dictionary(&dictionary)?,
        });

        if let Err(error) = self.committer.commit(&ops).await {
            tracing::warn!(
                dictionary_id = %dictionary.id,
                error = %error,
                "Promotion aborted, private dictionary left as is"
            );
            self.discard_copies(&dictionary.id, &copies, &error).await;
            return Err(SyncError::ConversionFailed(error.to_string()));
        }

        let ids: Vec<WordId> = words.iter().map(|word| word.id.clone()).collect();
        self.store
            .reassign_dictionary(&ids, Some(&dictionary.id))
            .await?;
        self.store.save_dictionary(&dictionary).await?;

        let deletes = ids
            .iter()
            .map(|id| {
                Ok(WriteOp::Delete {
                    path: DocPath::user_word(user_id, id.as_str())?,
                })
            })
            .collect::<SyncResult<Vec<_>>>()?;
        if let Err(error) = self.committer.commit(&deletes).await {
            // the copies are complete; leftovers are skipped as rows of another scope
            tracing::warn!(
                dictionary_id = %dictionary.id,
                error = %error,
                "Private copies of promoted words were not all removed"
            );
        }

        tracing::info!(
            dictionary_id = %dictionary.id,
            words = words.len(),
            "Promoted private dictionary"
        );
        Ok(dictionary)
    }

    /// Remove the word copies a failed promotion already committed.
    async fn discard_copies(&self, dictionary_id: &str, copies: &[DocPath], error: &SyncError) {
        let committed = match error {
            SyncError::SyncFailed {
                committed_chunks, ..
            } => (committed_chunks * self.committer.batch_size()).min(copies.len()),
            _ => 0,
        };
        if committed == 0 {
            return;
        }

        let deletes: Vec<WriteOp> = copies[..committed]
            .iter()
            .map(|path| WriteOp::Delete { path: path.clone() })
            .collect();
        if let Err(error) = self.committer.commit(&deletes).await {
            tracing::warn!(
                dictionary_id,
                copies = committed,
                error = %error,
                "Could not remove copies of an aborted promotion"
            );
        }
    }

    /// Grant `role` in a dictionary the actor owns.
    pub async fn add_collaborator(
        &self,
        actor: &Identity,
        dictionary_id: &str,
        member: &Identity,
        role: Role,
    ) -> SyncResult<SharedDictionary> {
        authorize(self.entitlement.as_ref(), &actor.user_id)?;
        crate::sync::identity::validate_user_id(&member.user_id)?;
        if role == Role::Owner {
            return Err(Error::InvalidInput("A dictionary has exactly one owner".into()).into());
        }

        let mut dictionary = self.fetch_dictionary(dictionary_id).await?;
        require_manage(&dictionary, &actor.user_id)?;
        if dictionary.owner == member.user_id {
            return Err(Error::InvalidInput("The owner's role cannot change".into()).into());
        }

        let collaborator = Collaborator {
            user_id: member.user_id.clone(),
            email: member.email.clone(),
            display_name: member.display_name.clone(),
            role,
            added_at: self.clock.now_millis(),
        };
        let ops = [
            WriteOp::Merge {
                path: DocPath::dictionary(dictionary_id)?,
                fields: vec![(
                    FieldPath::new(["collaborators", member.user_id.as_str()]),
                    Value::String(role.as_str().to_string()),
                )],
            },
            WriteOp::Set {
                path: DocPath::collaborator(dictionary_id, &member.user_id)?,
                data: codec::encode_collaborator(&collaborator)?,
            },
        ];
        self.committer.commit(&ops).await?;

        dictionary
            .collaborators
            .insert(member.user_id.clone(), role);
        self.store.save_dictionary(&dictionary).await?;
        tracing::info!(dictionary_id, user_id = %member.user_id, role = %role, "Collaborator added");
        Ok(dictionary)
    }

    /// Revoke a member's access. The owner cannot be removed.
    pub async fn remove_collaborator(
        &self,
        actor: &Identity,
        dictionary_id: &str,
        user_id: &str,
    ) -> SyncResult<SharedDictionary> {
        authorize(self.entitlement.as_ref(), &actor.user_id)?;
        let mut dictionary = self.fetch_dictionary(dictionary_id).await?;
        require_manage(&dictionary, &actor.user_id)?;
        if dictionary.owner == user_id {
            return Err(Error::InvalidInput("The owner cannot be removed".into()).into());
        }
        if dictionary.collaborators.remove(user_id).is_none() {
            return Err(Error::NotFound(format!("collaborator {user_id}")).into());
        }

        let ops = [
            WriteOp::Set {
                path: DocPath::dictionary(dictionary_id)?,
                data: codec::encode_dictionary(&dictionary)?,
            },
            WriteOp::Delete {
                path: DocPath::collaborator(dictionary_id, user_id)?,
            },
        ];
        self.committer.commit(&ops).await?;

        self.store.save_dictionary(&dictionary).await?;
        tracing::info!(dictionary_id, user_id, "Collaborator removed");
        Ok(dictionary)
    }

    /// Dictionaries the user belongs to, refreshed from the remote store.
    ///
    /// The local cache is replaced with the result.
    pub async fn list_dictionaries(&self, user_id: &str) -> SyncResult<Vec<SharedDictionary>> {
        let user_id = authorize(self.entitlement.as_ref(), user_id)?;
        let documents = self
            .remote
            .fetch_collection(&DocPath::dictionaries())
            .await?;

        let mut dictionaries: Vec<SharedDictionary> = documents
            .iter()
            .filter_map(|document| match codec::decode_dictionary(document) {
                Ok(dictionary) => Some(dictionary),
                Err(error) => {
                    tracing::warn!(
                        document = %document.path,
                        error = %error,
                        "Skipping malformed dictionary document"
                    );
                    None
                }
            })
            .filter(|dictionary| dictionary.role_of(user_id).is_some())
            .collect();
        dictionaries.sort_by_key(|dictionary| dictionary.name.to_lowercase());

        self.store.replace_dictionaries(&dictionaries).await?;
        Ok(dictionaries)
    }

    /// Dictionaries from the last [`list_dictionaries`](Self::list_dictionaries).
    pub async fn cached_dictionaries(&self) -> SyncResult<Vec<SharedDictionary>> {
        Ok(self.store.list_dictionaries().await?)
    }

    /// Add a new word to a shared dictionary on behalf of `actor`.
    ///
    /// The word is saved locally first; if the remote write fails it stays
    /// unsynced and goes out with the next push.
    pub async fn add_shared_word(
        &self,
        actor: &Identity,
        dictionary_id: &str,
        mut word: Word,
    ) -> SyncResult<Word> {
        authorize(self.entitlement.as_ref(), &actor.user_id)?;
        let dictionary = self.dictionary(dictionary_id).await?;
        require_write(&dictionary, &actor.user_id)?;

        let now = self.clock.now_millis();
        word.dictionary_id = Some(dictionary.id.clone());
        word.attribution = Some(Attribution {
            added_by_email: actor.email.clone(),
            added_by_display_name: actor.display_name.clone(),
            added_at: now,
        });
        word.touch(now);
        self.store.upsert_word(&word).await?;

        let path = DocPath::dictionary_word(&dictionary.id, word.id.as_str())?;
        let op = WriteOp::merge_top_level(
            path,
            codec::encode_word(&word)?,
            &codec::COLLABORATIVE_FIELDS,
        );
        self.committer.commit(&[op]).await?;
        self.store
            .mark_pushed(&[(word.id.clone(), word.updated_at)])
            .await?;
        word.synced = true;

        tracing::info!(dictionary_id, word_id = %word.id, "Shared word added");
        Ok(word)
    }

    /// Flip the actor's like on a shared word; returns the new value.
    pub async fn toggle_like(
        &self,
        actor: &Identity,
        dictionary_id: &str,
        word_id: &WordId,
    ) -> SyncResult<bool> {
        authorize(self.entitlement.as_ref(), &actor.user_id)?;
        let dictionary = self.dictionary(dictionary_id).await?;
        require_member(&dictionary, &actor.user_id)?;

        let word = self.shared_word(dictionary_id, word_id).await?;
        let previous = word.likes.get(&actor.email).copied();
        let liked = !previous.unwrap_or(false);

        self.write_collaborative_field(
            dictionary_id,
            word_id,
            "likes",
            &actor.email,
            Value::Bool(liked),
            |word| {
                word.likes.insert(actor.email.clone(), liked);
            },
            |word| match previous {
                Some(value) => {
                    word.likes.insert(actor.email.clone(), value);
                }
                None => {
                    word.likes.remove(&actor.email);
                }
            },
        )
        .await?;
        Ok(liked)
    }

    /// Apply a quiz answer to the actor's own difficulty on a shared word.
    pub async fn update_difficulty(
        &self,
        actor: &Identity,
        dictionary_id: &str,
        word_id: &WordId,
        delta: i32,
    ) -> SyncResult<i32> {
        authorize(self.entitlement.as_ref(), &actor.user_id)?;
        let dictionary = self.dictionary(dictionary_id).await?;
        require_member(&dictionary, &actor.user_id)?;

        let word = self.shared_word(dictionary_id, word_id).await?;
        let previous = word.difficulties.get(&actor.email).copied();
        let score = update_score(previous.unwrap_or_default(), delta);

        self.write_collaborative_field(
            dictionary_id,
            word_id,
            "difficulties",
            &actor.email,
            Value::from(score),
            |word| {
                word.difficulties.insert(actor.email.clone(), score);
            },
            |word| match previous {
                Some(value) => {
                    word.difficulties.insert(actor.email.clone(), value);
                }
                None => {
                    word.difficulties.remove(&actor.email);
                }
            },
        )
        .await?;
        Ok(score)
    }

    /// Optimistically update one collaborative map entry, then write it as a
    /// field merge. The local entry is restored when the write fails.
    #[allow(clippy::too_many_arguments)]
    async fn write_collaborative_field(
        &self,
        dictionary_id: &str,
        word_id: &WordId,
        field: &str,
        key: &str,
        value: Value,
        apply: impl Fn(&mut Word),
        revert: impl Fn(&mut Word),
    ) -> SyncResult<()> {
        self.update_cached_word(word_id, &apply).await?;

        let op = WriteOp::Merge {
            path: DocPath::dictionary_word(dictionary_id, word_id.as_str())?,
            fields: vec![(FieldPath::new([field, key]), value)],
        };
        if let Err(error) = self.committer.commit(&[op]).await {
            tracing::warn!(
                dictionary_id,
                word_id = %word_id,
                field,
                error = %error,
                "Collaborative update failed, reverting local copy"
            );
            self.update_cached_word(word_id, &revert).await?;
            return Err(error);
        }
        Ok(())
    }

    /// Change the local copy without touching `updated_at` or the sync flag.
    async fn update_cached_word(
        &self,
        word_id: &WordId,
        change: &impl Fn(&mut Word),
    ) -> SyncResult<()> {
        if let Some(mut word) = self.store.get_word(word_id).await? {
            change(&mut word);
            self.store.upsert_word(&word).await?;
        }
        Ok(())
    }

    async fn shared_word(&self, dictionary_id: &str, word_id: &WordId) -> SyncResult<Word> {
        match self.store.get_word(word_id).await? {
            Some(word) if word.dictionary_id.as_deref() == Some(dictionary_id) => Ok(word),
            _ => Err(Error::NotFound(format!("word {word_id} in dictionary {dictionary_id}")).into()),
        }
    }

    /// Cached metadata, falling back to the remote document.
    async fn dictionary(&self, dictionary_id: &str) -> SyncResult<SharedDictionary> {
        if let Some(dictionary) = self.store.get_dictionary(dictionary_id).await? {
            return Ok(dictionary);
        }
        self.fetch_dictionary(dictionary_id).await
    }

    async fn fetch_dictionary(&self, dictionary_id: &str) -> SyncResult<SharedDictionary> {
        let document = self
            .remote
            .get_document(&DocPath::dictionary(dictionary_id)?)
            .await?
            .ok_or_else(|| Error::NotFound(format!("dictionary {dictionary_id}")))?;
        let dictionary = codec::decode_dictionary(&document)?;
        self.store.save_dictionary(&dictionary).await?;
        Ok(dictionary)
    }
}

fn require_member(dictionary: &SharedDictionary, user_id: &str) -> SyncResult<Role> {
    dictionary.role_of(user_id).ok_or_else(|| {
        SyncError::PermissionDenied(format!("not a member of dictionary {}", dictionary.id))
    })
}

fn require_write(dictionary: &SharedDictionary, user_id: &str) -> SyncResult<()> {
    let role = require_member(dictionary, user_id)?;
    if role.can_write() {
        Ok(())
    } else {
        Err(SyncError::PermissionDenied(format!(
            "{role} cannot change words in dictionary {}",
            dictionary.id
        )))
    }
}

fn require_manage(dictionary: &SharedDictionary, user_id: &str) -> SyncResult<()> {
    let role = require_member(dictionary, user_id)?;
    if role.can_manage() {
        Ok(())
    } else {
        Err(SyncError::PermissionDenied(format!(
            "only the owner manages dictionary {}",
            dictionary.id
        )))
    }
}
