use std::sync::Arc;

use super::definition::RouteDefinition;
use super::parameters::Parameters;
use crate::error::Result;
use crate::request::RouteRequest;

/// Extracts parameter values for a route that is known to match a request.
pub struct ParameterBinder<'a> {
    route: &'a RouteDefinition,
}

impl<'a> ParameterBinder<'a> {
    pub fn new(route: &'a RouteDefinition) -> Self {
        Self { route }
    }

    /// Host captures first, then path captures (path values win on a name
    /// clash), then defaults for anything missing or null.
    pub fn parameters(&self, request: &RouteRequest) -> Result<Parameters> {
        let compiled = self.route.compiled()?;
        let mut parameters = Parameters::new();

        if let (Some(host), Some(domain)) = (&compiled.host, request.domain.as_deref()) {
            if let Some(captures) = host.captures(domain) {
                collect(captures, &mut parameters);
            }
        }

        let path = request.decoded_path();
        if let Some(captures) = compiled.path.captures(&path) {
            collect(captures, &mut parameters);
        }

        Ok(self.replace_defaults(parameters))
    }

    fn replace_defaults(&self, mut parameters: Parameters) -> Parameters {
        for (name, default) in self.route.defaults() {
            if parameters.get(name).is_none() {
                parameters.insert(Arc::<str>::from(name.as_str()), default.clone());
            }
        }
        parameters
    }
}

fn collect(captures: Vec<(&str, &str)>, parameters: &mut Parameters) {
    for (name, value) in captures {
        parameters.insert(Arc::<str>::from(name), Some(value.to_string()));
    }
}
