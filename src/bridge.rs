//! Command dispatcher connecting application-layer port messages to storage.
//!
//! Inbound messages are `{tag, data}` pairs arriving on a single-consumer
//! queue; they are dispatched strictly in arrival order. Each command invokes
//! one store or preference operation and emits at most one reply on the
//! outbound channel. Flow is strictly request/response: nothing here calls
//! back into the dispatcher.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    Note, NoteDraft, NoteView, PinDraft, PinView, PrefStore, Result, SiftError, Store, Tag,
};

/// An inbound command: a tag naming the operation plus its JSON payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PortMessage {
    pub tag: String,
    #[serde(default)]
    pub data: Value,
}

/// An outbound reply, named after the port it is delivered on.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tag", content = "data", rename_all = "camelCase")]
pub enum Reply {
    RecNotes(Vec<NoteView>),
    RecNote(Option<NoteView>),
    NoteSaved(i64),
    RecTags(Vec<Tag>),
    TagSaved(Tag),
    RecPins(Vec<PinView>),
    RecPin(PinView),
}

/// Payload of a GET_NOTES command.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotesQuery {
    #[serde(default)]
    search: String,
    #[serde(default)]
    tag_ids: Vec<i64>,
}

/// Payload of a CREATE_TAG command.
#[derive(Debug, Deserialize)]
struct TagForm {
    name: String,
    color: String,
}

/// Translates inbound commands into store/preference operations and routes
/// results back as named outbound replies.
pub struct Bridge {
    store: Store,
    prefs: PrefStore,
    outbound: mpsc::Sender<Reply>,
}

impl Bridge {
    pub fn new(store: Store, prefs: PrefStore, outbound: mpsc::Sender<Reply>) -> Self {
        Self {
            store,
            prefs,
            outbound,
        }
    }

    /// Serves commands until the inbound channel closes.
    ///
    /// A failed command aborts only itself; the dispatcher logs the error
    /// and keeps serving. No command is fatal to the process.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<PortMessage>) {
        info!("Bridge dispatcher started");

        while let Some(msg) = inbound.recv().await {
            let tag = msg.tag.clone();
            if let Err(e) = self.dispatch(msg).await {
                error!("Command {} failed: {}", tag, e);
            }
        }

        info!("Bridge dispatcher stopped");
    }

    /// Dispatches a single inbound command.
    ///
    /// Unknown tags produce a diagnostic and are otherwise ignored; they are
    /// never an error and never a reply.
    pub async fn dispatch(&mut self, msg: PortMessage) -> Result<()> {
        debug!("Dispatching inbound command: {}", msg.tag);

        match msg.tag.as_str() {
            "SWITCH_THEME" => {
                let value: String = serde_json::from_value(msg.data)?;
                let effective = self.prefs.switch_theme(&value)?;
                debug!("Effective theme is now {:?}", effective);
                Ok(())
            }

            "GET_NOTES" => {
                let query: NotesQuery = serde_json::from_value(msg.data)?;
                let notes = self.store.list_notes(&query.search, &query.tag_ids)?;
                self.send(Reply::RecNotes(notes)).await
            }

            "GET_NOTE" => {
                let id = id_from_value(&msg.data)?;
                let note = self.store.get_note(id)?;
                self.send(Reply::RecNote(note)).await
            }

            "SAVE_NOTE" => {
                let note: Note = serde_json::from_value(msg.data)?;
                self.store.update_note(&note)?;
                self.send(Reply::NoteSaved(0)).await
            }

            "CREATE_NOTE" => {
                let draft: NoteDraft = serde_json::from_value(msg.data)?;
                let id = self.store.create_note(&draft)?;
                self.send(Reply::NoteSaved(id)).await
            }

            "DELETE_NOTE" => {
                let id = id_from_value(&msg.data)?;
                self.store.delete_note(id)
            }

            "GET_TAGS" => {
                let search: String = serde_json::from_value(msg.data)?;
                let tags = self.store.list_tags(&search)?;
                self.send(Reply::RecTags(tags)).await
            }

            "CREATE_TAG" => {
                let form: TagForm = serde_json::from_value(msg.data)?;
                let tag = self.store.create_tag(&form.name, &form.color)?;
                self.send(Reply::TagSaved(tag)).await
            }

            "GET_PINS" => {
                let pins = self.store.list_pins()?;
                self.send(Reply::RecPins(pins)).await
            }

            "CREATE_PIN" => {
                let draft: PinDraft = serde_json::from_value(msg.data)?;
                let pin = self.store.create_pin(&draft)?;
                self.send(Reply::RecPin(pin)).await
            }

            "DELETE_PIN" => {
                let id = id_from_value(&msg.data)?;
                self.store.delete_pin(id)
            }

            "SAVE_FAVORITES" => {
                let ids: Vec<i64> = serde_json::from_value(msg.data)?;
                self.prefs.save_favorites(ids)
            }

            other => {
                warn!("Unhandled inbound command: \"{}\"", other);
                Ok(())
            }
        }
    }

    async fn send(&mut self, reply: Reply) -> Result<()> {
        self.outbound
            .send(reply)
            .await
            .map_err(|_| SiftError::PortClosed {
                message: "outbound reply channel is closed".to_string(),
            })
    }
}

/// Extracts a record identifier from a payload.
///
/// The application layer sends ids as JSON numbers or as numeric strings,
/// so both are accepted.
fn id_from_value(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| SiftError::InvalidPayload {
            message: format!("not a record id: {}", n),
        }),
        Value::String(s) => s.trim().parse().map_err(|_| SiftError::InvalidPayload {
            message: format!("not a record id: {:?}", s),
        }),
        other => Err(SiftError::InvalidPayload {
            message: format!("not a record id: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;

    fn bridge() -> (Bridge, mpsc::Receiver<Reply>, tempfile::TempDir) {
        let store = Store::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let prefs = PrefStore::open(dir.path().join("prefs.json"), None).unwrap();

        let (tx, rx) = mpsc::channel(16);
        (Bridge::new(store, prefs, tx), rx, dir)
    }

    fn msg(tag: &str, data: Value) -> PortMessage {
        PortMessage {
            tag: tag.to_string(),
            data,
        }
    }

    #[tokio::test]
    async fn unknown_tag_is_ignored_without_reply_or_error() {
        let (mut bridge, mut rx, _dir) = bridge();
        bridge
            .dispatch(msg("OPEN_PORTAL", json!({"to": "nowhere"})))
            .await
            .unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn create_then_get_notes_roundtrip() {
        let (mut bridge, mut rx, _dir) = bridge();

        bridge
            .dispatch(msg(
                "CREATE_NOTE",
                json!({"title": "standup", "content": "notes", "tagIds": []}),
            ))
            .await
            .unwrap();
        let Reply::NoteSaved(id) = rx.recv().await.unwrap() else {
            panic!("expected noteSaved reply");
        };
        assert!(id > 0);

        bridge
            .dispatch(msg("GET_NOTES", json!({"search": "", "tagIds": []})))
            .await
            .unwrap();
        let Reply::RecNotes(notes) = rx.recv().await.unwrap() else {
            panic!("expected recNotes reply");
        };
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "standup");
    }

    #[tokio::test]
    async fn get_note_accepts_a_numeric_string_id() {
        let (mut bridge, mut rx, _dir) = bridge();

        bridge
            .dispatch(msg(
                "CREATE_NOTE",
                json!({"title": "standup", "content": "", "tagIds": []}),
            ))
            .await
            .unwrap();
        let Reply::NoteSaved(id) = rx.recv().await.unwrap() else {
            panic!("expected noteSaved reply");
        };

        bridge
            .dispatch(msg("GET_NOTE", json!(id.to_string())))
            .await
            .unwrap();
        let Reply::RecNote(found) = rx.recv().await.unwrap() else {
            panic!("expected recNote reply");
        };
        assert_eq!(found.unwrap().id, id);

        bridge.dispatch(msg("GET_NOTE", json!(9999))).await.unwrap();
        let Reply::RecNote(missing) = rx.recv().await.unwrap() else {
            panic!("expected recNote reply");
        };
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn create_tag_twice_replies_with_the_same_record() {
        let (mut bridge, mut rx, _dir) = bridge();
        let payload = json!({"name": "work", "color": "indigo"});

        bridge
            .dispatch(msg("CREATE_TAG", payload.clone()))
            .await
            .unwrap();
        bridge.dispatch(msg("CREATE_TAG", payload)).await.unwrap();

        let Reply::TagSaved(first) = rx.recv().await.unwrap() else {
            panic!("expected tagSaved reply");
        };
        let Reply::TagSaved(second) = rx.recv().await.unwrap() else {
            panic!("expected tagSaved reply");
        };
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn save_note_acks_without_touching_missing_notes() {
        let (mut bridge, mut rx, _dir) = bridge();

        bridge
            .dispatch(msg(
                "SAVE_NOTE",
                json!({
                    "id": 42,
                    "title": "ghost",
                    "content": "",
                    "createdAt": "2025-01-01T00:00:00Z",
                    "updatedAt": "2025-01-02T00:00:00Z",
                    "tagIds": []
                }),
            ))
            .await
            .unwrap();

        assert!(matches!(rx.recv().await.unwrap(), Reply::NoteSaved(0)));
    }

    #[tokio::test]
    async fn pin_commands_roundtrip_with_resolved_tags() {
        let (mut bridge, mut rx, _dir) = bridge();

        bridge
            .dispatch(msg("CREATE_TAG", json!({"name": "work", "color": "indigo"})))
            .await
            .unwrap();
        let Reply::TagSaved(tag) = rx.recv().await.unwrap() else {
            panic!("expected tagSaved reply");
        };

        bridge
            .dispatch(msg(
                "CREATE_PIN",
                json!({"tagIds": [tag.id, 777], "searchQuery": "foo", "noteCount": 0}),
            ))
            .await
            .unwrap();
        let Reply::RecPin(pin) = rx.recv().await.unwrap() else {
            panic!("expected recPin reply");
        };
        assert_eq!(pin.tags, vec![tag]);

        bridge
            .dispatch(msg("DELETE_PIN", json!(pin.id)))
            .await
            .unwrap();
        bridge.dispatch(msg("GET_PINS", json!(null))).await.unwrap();
        let Reply::RecPins(pins) = rx.recv().await.unwrap() else {
            panic!("expected recPins reply");
        };
        assert!(pins.is_empty());
    }

    #[tokio::test]
    async fn theme_and_favorites_commands_emit_no_reply() {
        let (mut bridge, mut rx, _dir) = bridge();

        bridge
            .dispatch(msg("SWITCH_THEME", json!("dark")))
            .await
            .unwrap();
        bridge
            .dispatch(msg("SAVE_FAVORITES", json!([3, 1, 2])))
            .await
            .unwrap();

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(bridge.prefs.load_favorites(), &[3, 1, 2]);
    }

    #[test]
    fn reply_serializes_as_tag_and_data() {
        let encoded = serde_json::to_value(Reply::NoteSaved(7)).unwrap();
        assert_eq!(encoded, json!({"tag": "noteSaved", "data": 7}));
    }
}
