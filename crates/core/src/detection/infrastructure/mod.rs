pub mod detector_factory;
pub mod face_models;
pub mod landmarking_detector;
pub mod model_resolver;
pub mod model_store;
pub mod onnx_face_detector;
pub mod onnx_landmarker;
