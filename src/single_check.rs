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

use std::cell::RefCell;

/// Memoizes a value without the synchronization overhead of [`Once`](crate::Once).
///
/// Used to wrap bindings under the `reusable` scope: a reusable binding's value may legally be
/// computed more than once across the life of a component, so the planner picks this cheaper
/// wrapper instead of the double-check wrapper used for every other scope.
#[doc(hidden)]
pub struct SingleCheck<T> {
    value: RefCell<Option<T>>,
}

impl<T: Clone> SingleCheck<T> {
    pub fn new() -> Self {
        SingleCheck {
            value: RefCell::new(None),
        }
    }

    pub fn get<F>(&self, initializer: F) -> T
    where
        F: FnOnce() -> T,
    {
        if let Some(value) = self.value.borrow().as_ref() {
            return value.clone();
        }
        let value = initializer();
        *self.value.borrow_mut() = Some(value.clone());
        value
    }
}

impl<T: Clone> Default for SingleCheck<T> {
    fn default() -> Self {
        SingleCheck::new()
    }
}
