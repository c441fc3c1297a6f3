//! Sync protocol message types
//!
//! Envelopes exchanged with annotation sync peers using CBOR encoding. The
//! envelope carries routing fields in the clear; the topic-specific body
//! travels as opaque CBOR bytes in `data`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{Annotation, Interaction};

/// Peer ID for identifying this client
pub type PeerId = String;

/// Message topics understood by annotation peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "annotation_create")]
    Create,
    #[serde(rename = "annotation_update")]
    Update,
    #[serde(rename = "annotation_delete")]
    Delete,
    #[serde(rename = "annotation_interact")]
    Interact,
    /// Ask peers for their full annotation set for the stream.
    #[serde(rename = "annotation_reconcile_request")]
    ReconcileRequest,
    /// Full annotation set in response; applied as upserts.
    #[serde(rename = "annotation_reconcile_state")]
    ReconcileState,
}

/// Wire envelope: topic and routing in the clear, body as CBOR bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: Topic,
    pub sender_id: PeerId,
    pub stream_id: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// Body of an `annotation_delete` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBody {
    pub id: Uuid,
}

/// Body of an `annotation_interact` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractBody {
    pub id: Uuid,
    pub interaction: Interaction,
}

/// Body of an `annotation_reconcile_state` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateBody {
    pub annotations: Vec<Annotation>,
}

/// A decoded inbound event, ready to apply.
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    Create(Annotation),
    Update(Annotation),
    Delete(Uuid),
    Interact { id: Uuid, interaction: Interaction },
    ReconcileRequest,
    ReconcileState(Vec<Annotation>),
}

impl Envelope {
    /// Create an `annotation_create` envelope
    pub fn create(sender_id: &str, stream_id: &str, annotation: &Annotation) -> Self {
        Self::with_body(Topic::Create, sender_id, stream_id, annotation)
    }

    /// Create an `annotation_update` envelope
    pub fn update(sender_id: &str, stream_id: &str, annotation: &Annotation) -> Self {
        Self::with_body(Topic::Update, sender_id, stream_id, annotation)
    }

    /// Create an `annotation_delete` envelope
    pub fn delete(sender_id: &str, stream_id: &str, id: Uuid) -> Self {
        Self::with_body(Topic::Delete, sender_id, stream_id, &DeleteBody { id })
    }

    /// Create an `annotation_interact` envelope
    pub fn interact(sender_id: &str, stream_id: &str, id: Uuid, interaction: Interaction) -> Self {
        Self::with_body(
            Topic::Interact,
            sender_id,
            stream_id,
            &InteractBody { id, interaction },
        )
    }

    /// Create a reconcile request (body is empty; the stream id rides the
    /// envelope)
    pub fn reconcile_request(sender_id: &str, stream_id: &str) -> Self {
        Self {
            topic: Topic::ReconcileRequest,
            sender_id: sender_id.to_string(),
            stream_id: stream_id.to_string(),
            data: Vec::new(),
        }
    }

    /// Create a reconcile state response carrying the full annotation set
    pub fn reconcile_state(sender_id: &str, stream_id: &str, annotations: Vec<Annotation>) -> Self {
        Self::with_body(
            Topic::ReconcileState,
            sender_id,
            stream_id,
            &StateBody { annotations },
        )
    }

    fn with_body<T: Serialize>(topic: Topic, sender_id: &str, stream_id: &str, body: &T) -> Self {
        Self {
            topic,
            sender_id: sender_id.to_string(),
            stream_id: stream_id.to_string(),
            data: encode_cbor(body),
        }
    }

    /// Encode the envelope to CBOR bytes
    pub fn encode(&self) -> Vec<u8> {
        encode_cbor(self)
    }

    /// Decode an envelope from CBOR bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        ciborium::from_reader(bytes)
            .map_err(|e| EngineError::InvalidInput(format!("invalid sync envelope: {e}")))
    }

    /// Decode the topic-specific body into a typed event.
    pub fn decode_event(&self) -> Result<RemoteEvent, EngineError> {
        match self.topic {
            Topic::Create => Ok(RemoteEvent::Create(self.body()?)),
            Topic::Update => Ok(RemoteEvent::Update(self.body()?)),
            Topic::Delete => {
                let body: DeleteBody = self.body()?;
                Ok(RemoteEvent::Delete(body.id))
            }
            Topic::Interact => {
                let body: InteractBody = self.body()?;
                Ok(RemoteEvent::Interact {
                    id: body.id,
                    interaction: body.interaction,
                })
            }
            Topic::ReconcileRequest => Ok(RemoteEvent::ReconcileRequest),
            Topic::ReconcileState => {
                let body: StateBody = self.body()?;
                Ok(RemoteEvent::ReconcileState(body.annotations))
            }
        }
    }

    fn body<T: serde::de::DeserializeOwned>(&self) -> Result<T, EngineError> {
        ciborium::from_reader(self.data.as_slice()).map_err(|e| {
            EngineError::InvalidInput(format!("invalid sync body for {:?}: {e}", self.topic))
        })
    }
}

// Encoding plain owned data into a Vec cannot fail
fn encode_cbor<T: Serialize>(value: &T) -> Vec<u8> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).expect("CBOR encoding failed");
    bytes
}
