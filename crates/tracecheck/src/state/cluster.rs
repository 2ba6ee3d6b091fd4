//! Cluster: fixed server registry mapping logged ids to array positions.

use std::collections::HashMap;
use thiserror::Error;

use crate::event::{LogEvent, ServerId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("cluster has no servers")]
    Empty,

    #[error("server {0} listed more than once")]
    Duplicate(ServerId),
}

/// Ordered set of servers. Position in the list is the server index used by
/// every per-server array of a [`crate::state::SystemState`].
#[derive(Debug, Clone)]
pub struct Cluster {
    ids: Vec<ServerId>,
    index: HashMap<ServerId, usize>,
}

impl Cluster {
    pub fn new(ids: Vec<ServerId>) -> Result<Self, ClusterError> {
        if ids.is_empty() {
            return Err(ClusterError::Empty);
        }
        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(ClusterError::Duplicate(id.clone()));
            }
        }
        Ok(Self { ids, index })
    }

    /// Servers seen in `events`, in natural id order.
    pub fn discover(events: &[LogEvent]) -> Result<Self, ClusterError> {
        let mut ids: Vec<ServerId> = Vec::new();
        for event in events {
            if !ids.contains(&event.server_id) {
                ids.push(event.server_id.clone());
            }
        }
        ids.sort_by(|a, b| a.natural_cmp(b));
        Self::new(ids)
    }

    pub fn index_of(&self, id: &ServerId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id(&self, index: usize) -> Option<&ServerId> {
        self.ids.get(index)
    }

    pub fn ids(&self) -> &[ServerId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
