mod context_properties;
