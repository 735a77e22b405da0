// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

/// `Observe` is implemented by whatever collects the state of a device that
/// a check is made against.
///
/// Observations are taken again on every attempt of a retried check, so
/// implementations must not change the state of the device.
pub trait Observe {
    /// The data an observation returns.
    ///
    /// This is a [GAT] parameterized over a lifetime `'a where Self: 'a`, so
    /// it may borrow from the observer.
    ///
    /// [GAT]: https://rust-lang.github.io/generic-associated-types-initiative/explainer/motivation.html
    type Observation<'a>
    where
        Self: 'a;

    fn observe<'a>(&'a self) -> impl Future<Output = Self::Observation<'a>> + Send
    where
        Self: 'a;
}
