pub mod raster_image_decoder;
