//! In-memory `KVReader`/`KVWriter` test double, shared across the
//! integration tests. Not part of the library: a real backend is always
//! supplied by the caller (§6.2).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::convert::Infallible;

use auth_trie::{KVReader, KVWriter};

#[derive(Default)]
pub struct MemoryStore {
    data: RefCell<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> { self.data.borrow().clone() }

    /// Writes through shared access, for use from a [`KVWriter`] wrapper that
    /// only ever holds `&MemoryStore` (the trie itself holds the same
    /// reference for reads).
    pub fn put_through(&self, key: &[u8], value: &[u8]) -> Result<(), Infallible> {
        self.data.borrow_mut().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    pub fn delete_through(&self, key: &[u8]) -> Result<(), Infallible> {
        self.data.borrow_mut().remove(key);
        Ok(())
    }
}

impl KVReader for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> { Ok(self.data.borrow().get(key).cloned()) }
}

impl KVWriter for MemoryStore {
    type Error = Infallible;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.data.borrow_mut().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error> {
        self.data.borrow_mut().remove(key);
        Ok(())
    }
}
