use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, EnvVar, Pod, PodSpec, Volume, VolumeMount,
};
use tracing::debug;

use super::language::LanguageMutator;
use super::{MOUNT_PATH, MutationError, VOLUME_NAME, pod_display};

pub const INIT_CONTAINER_NAME: &str = "datadog-tracer-init";
pub const JAVA_TOOL_OPTIONS_KEY: &str = "JAVA_TOOL_OPTIONS";
/// Appended to any existing value, hence the leading space.
pub const JAVA_TOOL_OPTIONS_VALUE: &str = " -javaagent:/datadog/dd-java-agent.jar";

pub struct JavaMutator;

impl LanguageMutator for JavaMutator {
    fn mutate(&self, pod: &mut Pod, image: &str) -> Result<(), MutationError> {
        inject_init_container(pod, image)?;
        inject_config(pod)
    }
}

fn tracer_mount() -> VolumeMount {
    VolumeMount {
        name: VOLUME_NAME.to_string(),
        mount_path: MOUNT_PATH.to_string(),
        ..Default::default()
    }
}

fn spec_mut(pod: &mut Pod) -> &mut PodSpec {
    pod.spec.get_or_insert_with(PodSpec::default)
}

fn inject_init_container(pod: &mut Pod, image: &str) -> Result<(), MutationError> {
    let pod_str = pod_display(pod);
    debug!(
        container = INIT_CONTAINER_NAME,
        image, pod = %pod_str, "injecting init container"
    );

    let init_containers = spec_mut(pod).init_containers.get_or_insert_with(Vec::new);
    if init_containers.iter().any(|c| c.name == INIT_CONTAINER_NAME) {
        return Err(MutationError::AlreadyInstrumented {
            container: INIT_CONTAINER_NAME.to_string(),
            pod: pod_str,
        });
    }

    init_containers.push(Container {
        name: INIT_CONTAINER_NAME.to_string(),
        image: Some(image.to_string()),
        command: Some(vec![
            "sh".to_string(),
            "copy-javaagent.sh".to_string(),
            MOUNT_PATH.to_string(),
        ]),
        volume_mounts: Some(vec![tracer_mount()]),
        ..Default::default()
    });

    Ok(())
}

fn inject_config(pod: &mut Pod) -> Result<(), MutationError> {
    let spec = spec_mut(pod);
    spec.volumes.get_or_insert_with(Vec::new).push(Volume {
        name: VOLUME_NAME.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    });

    for container in &mut spec.containers {
        let env = container.env.get_or_insert_with(Vec::new);
        match env.iter_mut().find(|e| e.name == JAVA_TOOL_OPTIONS_KEY) {
            None => env.push(EnvVar {
                name: JAVA_TOOL_OPTIONS_KEY.to_string(),
                value: Some(JAVA_TOOL_OPTIONS_VALUE.to_string()),
                ..Default::default()
            }),
            Some(var) if var.value_from.is_some() => {
                return Err(MutationError::EnvFromSource {
                    key: JAVA_TOOL_OPTIONS_KEY.to_string(),
                    container: container.name.clone(),
                });
            }
            Some(var) => var
                .value
                .get_or_insert_with(String::new)
                .push_str(JAVA_TOOL_OPTIONS_VALUE),
        }

        container
            .volume_mounts
            .get_or_insert_with(Vec::new)
            .push(tracer_mount());
    }

    Ok(())
}
