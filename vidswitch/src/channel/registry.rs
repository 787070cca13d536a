use std::collections::HashMap;

use anyhow::{Result, bail};

use super::types::{Channel, ChannelId};

/**
    Immutable list of configured channels.

    Keeps configuration order for listing and an index for lookups.
*/
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    channels: Vec<Channel>,
    index: HashMap<ChannelId, usize>,
}

impl ChannelRegistry {
    /// Build a registry, rejecting empty ids and duplicates.
    pub fn new(channels: Vec<Channel>) -> Result<Self> {
        let mut index = HashMap::with_capacity(channels.len());
        for (position, channel) in channels.iter().enumerate() {
            if channel.id.as_str().trim().is_empty() {
                bail!("Channel at position {} has an empty id", position + 1);
            }
            if index.insert(channel.id.clone(), position).is_some() {
                bail!("Duplicate channel id '{}'", channel.id);
            }
        }
        Ok(Self { channels, index })
    }

    pub fn get(&self, id: &ChannelId) -> Option<&Channel> {
        self.index.get(id).map(|&i| &self.channels[i])
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.index.contains_key(id)
    }

    pub fn first(&self) -> Option<&Channel> {
        self.channels.first()
    }

    pub fn list(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
