use std::sync::Arc;

use super::definition::RouteDefinition;
use super::parameters::Parameters;
use crate::error::{Result, RouteError};

/// A route paired with the parameters of one request.
///
/// Produced by [`RouteDefinition::bind`] or by the route table on a match.
/// An unbound handle (see [`BoundRoute::unbound`]) refuses parameter reads
/// with [`RouteError::NotBound`].
#[derive(Debug, Clone)]
pub struct BoundRoute {
    route: Arc<RouteDefinition>,
    parameters: Option<Parameters>,
    original: Option<Parameters>,
}

impl BoundRoute {
    #[must_use]
    pub fn unbound(route: Arc<RouteDefinition>) -> Self {
        Self {
            route,
            parameters: None,
            original: None,
        }
    }

    pub(crate) fn with_parameters(route: Arc<RouteDefinition>, parameters: Parameters) -> Self {
        Self {
            route,
            original: Some(parameters.clone()),
            parameters: Some(parameters),
        }
    }

    #[must_use]
    pub fn route(&self) -> &Arc<RouteDefinition> {
        &self.route
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.parameters.is_some()
    }

    pub fn parameters(&self) -> Result<&Parameters> {
        self.parameters.as_ref().ok_or(RouteError::NotBound)
    }

    /// Parameters as they were when the route was bound, before any
    /// [`BoundRoute::set_parameter`] or [`BoundRoute::forget_parameter`].
    pub fn original_parameters(&self) -> Result<&Parameters> {
        self.original.as_ref().ok_or(RouteError::NotBound)
    }

    pub fn parameters_without_nulls(&self) -> Result<Parameters> {
        Ok(self.parameters()?.without_nulls())
    }

    /// Value of `name`, or `default` when it is absent or null.
    pub fn parameter<'a>(
        &'a self,
        name: &str,
        default: Option<&'a str>,
    ) -> Result<Option<&'a str>> {
        Ok(self.parameters()?.get(name).or(default))
    }

    /// Whether `name` is present. An unbound route has no parameters.
    #[must_use]
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters
            .as_ref()
            .is_some_and(|params| params.contains(name))
    }

    pub fn set_parameter(&mut self, name: &str, value: Option<String>) -> Result<()> {
        let params = self.parameters.as_mut().ok_or(RouteError::NotBound)?;
        params.insert(Arc::<str>::from(name), value);
        Ok(())
    }

    pub fn forget_parameter(&mut self, name: &str) -> Result<()> {
        let params = self.parameters.as_mut().ok_or(RouteError::NotBound)?;
        params.remove(name);
        Ok(())
    }
}
