#[derive(Clone)]
pub struct ExtraFunctions {
    pub acceleration_structure: ash::khr::acceleration_structure::Device,
    pub raytracing_pipeline: ash::khr::ray_tracing_pipeline::Device,
}

impl ExtraFunctions {
    pub fn new(instance: &ash::Instance, device: &ash::Device) -> Self {
        let acceleration_structure =
            ash::khr::acceleration_structure::Device::new(instance, device);
        let raytracing_pipeline = ash::khr::ray_tracing_pipeline::Device::new(instance, device);
        Self {
            acceleration_structure,
            raytracing_pipeline,
        }
    }
}
