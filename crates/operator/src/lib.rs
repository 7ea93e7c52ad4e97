//! Shared wiring between the `operator` and `crdgen` binaries.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

use operator_types::crd::{TranslationJob, TranslationService, WikiTarget};

/// Every custom resource this operator owns, in the order `crdgen` prints
/// them.
pub fn crds() -> Vec<CustomResourceDefinition> {
    vec![WikiTarget::crd(), TranslationJob::crd(), TranslationService::crd()]
}
