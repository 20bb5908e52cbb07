/*
Copyright 2021 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::collections::HashMap;
use std::hash::Hash;

/// Builder referenced by generated multibound-set expressions.
///
/// `builder(individual_count, collection_count)` mirrors the two-arity contribution shape a
/// binding graph can aggregate: individually-contributed (`@IntoSet`) elements and whole
/// collections contributed via `@ElementsIntoSet`.
pub struct SetFactory<T> {
    elements: Vec<T>,
}

impl<T> SetFactory<T> {
    pub fn builder(individual_count: usize, collection_count: usize) -> Self {
        SetFactory {
            elements: Vec::with_capacity(individual_count + collection_count),
        }
    }

    pub fn add_provider(mut self, provider: impl Fn() -> T) -> Self {
        self.elements.push(provider());
        self
    }

    pub fn add_collection_provider(mut self, provider: impl Fn() -> Vec<T>) -> Self {
        self.elements.extend(provider());
        self
    }

    pub fn build(self) -> Vec<T> {
        self.elements
    }
}

/// Builder referenced by generated multibound-map expressions.
pub struct MapFactory<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V> MapFactory<K, V> {
    pub fn builder(size: usize) -> Self {
        MapFactory {
            entries: HashMap::with_capacity(size),
        }
    }

    pub fn put(mut self, key: K, provider: impl Fn() -> V) -> Self {
        self.entries.insert(key, provider());
        self
    }

    pub fn build(self) -> HashMap<K, V> {
        self.entries
    }
}
