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

/// A placeholder factory installed at a field while its real initializer is still being
/// constructed, breaking an initialization-order cycle between two bindings.
///
/// The component writer allocates one of these when a binding's `InitState` is driven to
/// `Delegated`: the field is first populated with `DelegateFactory::new()`, the other half of the
/// cycle is initialized against it, and once the real factory exists it is installed with
/// [`DelegateFactory::set_delegate`]. Calling [`DelegateFactory::get`] before the delegate has
/// been set is a bug in the generated initialization order, not a recoverable runtime condition.
#[doc(hidden)]
pub struct DelegateFactory<'a, T> {
    delegate: RefCell<Option<Box<dyn Fn() -> T + 'a>>>,
}

impl<'a, T> DelegateFactory<'a, T> {
    pub fn new() -> Self {
        DelegateFactory {
            delegate: RefCell::new(None),
        }
    }

    pub fn set_delegate(&self, delegate: impl Fn() -> T + 'a) {
        *self.delegate.borrow_mut() = Some(Box::new(delegate));
    }

    pub fn get(&self) -> T {
        let borrow = self.delegate.borrow();
        let delegate = borrow
            .as_ref()
            .expect("DelegateFactory.get() called before set_delegate()");
        delegate()
    }
}

impl<'a, T> Default for DelegateFactory<'a, T> {
    fn default() -> Self {
        DelegateFactory::new()
    }
}
