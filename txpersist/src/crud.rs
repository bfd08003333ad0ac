use txstore::storage::engine::Engine;

use crate::error::Result;
use crate::keys;
use crate::model::{Checkpoint, EventStream, Listener};
use crate::store::{Direction, Persistence};

impl<E: Engine> Persistence<E> {
    pub fn get_stream(&self, id: &str) -> Result<Option<EventStream>> {
        let _guard = self.read_lock();
        match self.raw_get(&keys::eventstream_key(id))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    pub fn write_stream(&self, stream: &EventStream) -> Result<()> {
        let _guard = self.write_lock();
        self.raw_set(&keys::eventstream_key(&stream.id), serde_json::to_vec(stream)?)
    }

    pub fn delete_stream(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock();
        self.raw_delete(&keys::eventstream_key(id))
    }

    pub fn list_streams(&self, after: &[u8], limit: usize, dir: Direction) -> Result<Vec<EventStream>> {
        self.list_direct(keys::eventstream_prefix(), keys::eventstream_end(), after, limit, dir, |bytes| {
            Ok(Some(serde_json::from_slice(bytes)?))
        })
    }

    pub fn get_listener(&self, id: &str) -> Result<Option<Listener>> {
        let _guard = self.read_lock();
        match self.raw_get(&keys::listener_key(id))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    pub fn write_listener(&self, listener: &Listener) -> Result<()> {
        let _guard = self.write_lock();
        self.raw_set(&keys::listener_key(&listener.id), serde_json::to_vec(listener)?)
    }

    pub fn delete_listener(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock();
        self.raw_delete(&keys::listener_key(id))
    }

    pub fn list_listeners(&self, after: &[u8], limit: usize, dir: Direction) -> Result<Vec<Listener>> {
        self.list_direct(keys::listener_prefix(), keys::listener_end(), after, limit, dir, |bytes| {
            Ok(Some(serde_json::from_slice(bytes)?))
        })
    }

    /// Same as `list_listeners`, filtered to a single stream. Exercises the
    /// decode-time filter path used by index resolution, against a direct
    /// scan instead of an index.
    pub fn list_stream_listeners(
        &self,
        stream_id: &str,
        after: &[u8],
        limit: usize,
        dir: Direction,
    ) -> Result<Vec<Listener>> {
        let stream_id = stream_id.to_string();
        self.list_direct(keys::listener_prefix(), keys::listener_end(), after, limit, dir, move |bytes| {
            let listener: Listener = serde_json::from_slice(bytes)?;
            Ok(if listener.stream_id == stream_id { Some(listener) } else { None })
        })
    }

    pub fn get_checkpoint(&self, stream_id: &str) -> Result<Option<Checkpoint>> {
        let _guard = self.read_lock();
        match self.raw_get(&keys::checkpoint_key(stream_id))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    pub fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let _guard = self.write_lock();
        self.raw_set(&keys::checkpoint_key(&checkpoint.stream_id), serde_json::to_vec(checkpoint)?)
    }

    pub fn delete_checkpoint(&self, stream_id: &str) -> Result<()> {
        let _guard = self.write_lock();
        self.raw_delete(&keys::checkpoint_key(stream_id))
    }
}
